use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Domain, TasteVector, UserDomainProfile};

/// A profile together with its storage version, used for optimistic
/// concurrency on the read-modify-write rating path
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProfile {
    pub profile: UserDomainProfile,
    pub version: i64,
}

/// Access to per-user-per-domain preference state
///
/// This is the only write path into profile state. Writes are
/// compare-and-swap on a version column: two concurrent ratings for the
/// same `(user, domain)` cannot silently clobber each other, the loser
/// gets `AppError::WriteConflict` and the caller retries.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the stored profile, or `None` on cold start (defaults are
    /// materialized by the caller without persisting)
    async fn get(&self, user_id: Uuid, domain: Domain) -> AppResult<Option<StoredProfile>>;

    /// Upserts the profile after a rating, incrementing `ratings_count`
    /// by exactly 1
    ///
    /// `expected_version == 0` means "no row existed when read"; a
    /// concurrent insert or a stale version surfaces as `WriteConflict`.
    /// Returns the new version.
    async fn save_rated(
        &self,
        user_id: Uuid,
        domain: Domain,
        profile: &UserDomainProfile,
        expected_version: i64,
    ) -> AppResult<i64>;

    /// Persists a quick-feedback correction to `mu`/`sigma` without
    /// touching `ratings_count` or `beta`
    async fn save_nudged(
        &self,
        user_id: Uuid,
        domain: Domain,
        mu: &TasteVector,
        sigma: &TasteVector,
        expected_version: i64,
    ) -> AppResult<i64>;
}

/// Postgres-backed profile store
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, user_id: Uuid, domain: Domain) -> AppResult<Option<StoredProfile>> {
        let row = sqlx::query(
            r#"
            SELECT mu, sigma, beta, ratings_count, version
            FROM taste_profiles
            WHERE user_id = $1 AND domain = $2
            "#,
        )
        .bind(user_id)
        .bind(domain.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Json(mu): Json<TasteVector> = row.try_get("mu")?;
        let Json(sigma): Json<TasteVector> = row.try_get("sigma")?;
        Ok(Some(StoredProfile {
            profile: UserDomainProfile {
                mu,
                sigma,
                beta: row.try_get("beta")?,
                ratings_count: row.try_get("ratings_count")?,
            },
            version: row.try_get("version")?,
        }))
    }

    async fn save_rated(
        &self,
        user_id: Uuid,
        domain: Domain,
        profile: &UserDomainProfile,
        expected_version: i64,
    ) -> AppResult<i64> {
        if expected_version == 0 {
            let result = sqlx::query(
                r#"
                INSERT INTO taste_profiles (user_id, domain, mu, sigma, beta, ratings_count, version)
                VALUES ($1, $2, $3, $4, $5, 1, 1)
                ON CONFLICT (user_id, domain) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(domain.as_str())
            .bind(Json(&profile.mu))
            .bind(Json(&profile.sigma))
            .bind(profile.beta)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::WriteConflict(format!(
                    "profile for user {user_id} in {domain} was created concurrently"
                )));
            }
            return Ok(1);
        }

        let result = sqlx::query(
            r#"
            UPDATE taste_profiles
            SET mu = $3, sigma = $4, beta = $5,
                ratings_count = ratings_count + 1,
                version = version + 1,
                updated_at = NOW()
            WHERE user_id = $1 AND domain = $2 AND version = $6
            "#,
        )
        .bind(user_id)
        .bind(domain.as_str())
        .bind(Json(&profile.mu))
        .bind(Json(&profile.sigma))
        .bind(profile.beta)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::WriteConflict(format!(
                "profile for user {user_id} in {domain} changed since read (version {expected_version})"
            )));
        }
        Ok(expected_version + 1)
    }

    async fn save_nudged(
        &self,
        user_id: Uuid,
        domain: Domain,
        mu: &TasteVector,
        sigma: &TasteVector,
        expected_version: i64,
    ) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            UPDATE taste_profiles
            SET mu = $3, sigma = $4,
                version = version + 1,
                updated_at = NOW()
            WHERE user_id = $1 AND domain = $2 AND version = $5
            "#,
        )
        .bind(user_id)
        .bind(domain.as_str())
        .bind(Json(mu))
        .bind(Json(sigma))
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::WriteConflict(format!(
                "profile for user {user_id} in {domain} changed since read (version {expected_version})"
            )));
        }
        Ok(expected_version + 1)
    }
}

/// In-memory profile store with the same version semantics as the
/// Postgres one, used by tests and local runs
#[derive(Default)]
pub struct InMemoryProfileStore {
    inner: RwLock<HashMap<(Uuid, Domain), StoredProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: Uuid, domain: Domain) -> AppResult<Option<StoredProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.get(&(user_id, domain)).cloned())
    }

    async fn save_rated(
        &self,
        user_id: Uuid,
        domain: Domain,
        profile: &UserDomainProfile,
        expected_version: i64,
    ) -> AppResult<i64> {
        use std::collections::hash_map::Entry;

        let mut inner = self.inner.write().await;

        match inner.entry((user_id, domain)) {
            Entry::Vacant(entry) if expected_version == 0 => {
                let mut stored = profile.clone();
                stored.ratings_count = 1;
                entry.insert(StoredProfile {
                    profile: stored,
                    version: 1,
                });
                Ok(1)
            }
            Entry::Occupied(mut entry) if entry.get().version == expected_version => {
                let stored = entry.get_mut();
                let ratings_count = stored.profile.ratings_count + 1;
                stored.profile = profile.clone();
                stored.profile.ratings_count = ratings_count;
                stored.version += 1;
                Ok(stored.version)
            }
            _ => Err(AppError::WriteConflict(format!(
                "profile for user {user_id} in {domain} changed since read (version {expected_version})"
            ))),
        }
    }

    async fn save_nudged(
        &self,
        user_id: Uuid,
        domain: Domain,
        mu: &TasteVector,
        sigma: &TasteVector,
        expected_version: i64,
    ) -> AppResult<i64> {
        let mut inner = self.inner.write().await;

        match inner.get_mut(&(user_id, domain)) {
            Some(stored) if stored.version == expected_version => {
                stored.profile.mu = mu.clone();
                stored.profile.sigma = sigma.clone();
                stored.version += 1;
                Ok(stored.version)
            }
            _ => Err(AppError::WriteConflict(format!(
                "profile for user {user_id} in {domain} changed since read (version {expected_version})"
            ))),
        }
    }
}
