use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Domain, TasteVector, SEED_CONFIDENCE};

/// A variant's community vector together with how much it is trusted
#[derive(Debug, Clone, PartialEq)]
pub struct SeededVector {
    pub vector: TasteVector,
    pub confidence: f64,
}

/// Catalog row fed to the recommendation scorer
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCandidate {
    pub variant_id: Uuid,
    pub slug: Option<String>,
    pub label: Option<String>,
    pub vector: TasteVector,
}

/// Access to per-variant community taste vectors
#[async_trait]
pub trait VariantVectorStore: Send + Sync {
    /// Returns the vector for a variant, seeding it from the domain
    /// default (confidence 0.2) when absent
    ///
    /// A stored vector belonging to a different domain is treated as
    /// absent for this purpose: the domain default is returned instead of
    /// an error. Seeding races are benign since every first-rater inserts
    /// identical defaults.
    async fn get_or_seed(&self, variant_id: Uuid, domain: Domain) -> AppResult<SeededVector>;

    /// Fills in missing descriptive fields without overwriting set ones;
    /// never rewrites the vector itself
    async fn update_metadata(
        &self,
        variant_id: Uuid,
        slug: Option<String>,
        label: Option<String>,
    ) -> AppResult<()>;

    /// All vectors in a domain, in creation order
    async fn list_by_domain(&self, domain: Domain) -> AppResult<Vec<VariantCandidate>>;
}

/// Postgres-backed variant vector store
pub struct PgVariantVectorStore {
    pool: PgPool,
}

impl PgVariantVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VariantVectorStore for PgVariantVectorStore {
    async fn get_or_seed(&self, variant_id: Uuid, domain: Domain) -> AppResult<SeededVector> {
        let default = domain.default_vector();

        // Idempotent seed: whichever concurrent first-rater lands first
        // wins, and both inserted the same defaults
        sqlx::query(
            r#"
            INSERT INTO variant_vectors (variant_id, domain, vector, confidence)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (variant_id) DO NOTHING
            "#,
        )
        .bind(variant_id)
        .bind(domain.as_str())
        .bind(Json(&default))
        .bind(SEED_CONFIDENCE)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT domain, vector, confidence FROM variant_vectors WHERE variant_id = $1",
        )
        .bind(variant_id)
        .fetch_one(&self.pool)
        .await?;

        let stored_domain: String = row.try_get("domain")?;
        if stored_domain != domain.as_str() {
            tracing::warn!(
                variant_id = %variant_id,
                stored_domain = %stored_domain,
                requested_domain = %domain,
                "Variant vector belongs to a different domain, falling back to defaults"
            );
            return Ok(SeededVector {
                vector: default,
                confidence: SEED_CONFIDENCE,
            });
        }

        let Json(vector): Json<TasteVector> = row.try_get("vector")?;
        let confidence: f64 = row.try_get("confidence")?;
        Ok(SeededVector { vector, confidence })
    }

    async fn update_metadata(
        &self,
        variant_id: Uuid,
        slug: Option<String>,
        label: Option<String>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE variant_vectors
            SET slug = COALESCE(slug, $2),
                label = COALESCE(label, $3),
                updated_at = NOW()
            WHERE variant_id = $1
            "#,
        )
        .bind(variant_id)
        .bind(slug)
        .bind(label)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_domain(&self, domain: Domain) -> AppResult<Vec<VariantCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT variant_id, slug, label, vector
            FROM variant_vectors
            WHERE domain = $1
            ORDER BY created_at, variant_id
            "#,
        )
        .bind(domain.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(vector): Json<TasteVector> = row.try_get("vector")?;
            candidates.push(VariantCandidate {
                variant_id: row.try_get("variant_id")?,
                slug: row.try_get("slug")?,
                label: row.try_get("label")?,
                vector,
            });
        }
        Ok(candidates)
    }
}

struct StoredVariant {
    domain: Domain,
    vector: TasteVector,
    confidence: f64,
    slug: Option<String>,
    label: Option<String>,
    seq: u64,
}

/// In-memory variant vector store, used by tests and local runs without
/// Postgres
#[derive(Default)]
pub struct InMemoryVariantVectorStore {
    inner: RwLock<HashMap<Uuid, StoredVariant>>,
    next_seq: AtomicU64,
}

impl InMemoryVariantVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VariantVectorStore for InMemoryVariantVectorStore {
    async fn get_or_seed(&self, variant_id: Uuid, domain: Domain) -> AppResult<SeededVector> {
        let mut inner = self.inner.write().await;

        if !inner.contains_key(&variant_id) {
            inner.insert(
                variant_id,
                StoredVariant {
                    domain,
                    vector: domain.default_vector(),
                    confidence: SEED_CONFIDENCE,
                    slug: None,
                    label: None,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                },
            );
        }

        let stored = &inner[&variant_id];
        if stored.domain != domain {
            tracing::warn!(
                variant_id = %variant_id,
                stored_domain = %stored.domain,
                requested_domain = %domain,
                "Variant vector belongs to a different domain, falling back to defaults"
            );
            return Ok(SeededVector {
                vector: domain.default_vector(),
                confidence: SEED_CONFIDENCE,
            });
        }

        Ok(SeededVector {
            vector: stored.vector.clone(),
            confidence: stored.confidence,
        })
    }

    async fn update_metadata(
        &self,
        variant_id: Uuid,
        slug: Option<String>,
        label: Option<String>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(stored) = inner.get_mut(&variant_id) {
            if stored.slug.is_none() {
                stored.slug = slug;
            }
            if stored.label.is_none() {
                stored.label = label;
            }
        }
        Ok(())
    }

    async fn list_by_domain(&self, domain: Domain) -> AppResult<Vec<VariantCandidate>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<(&Uuid, &StoredVariant)> = inner
            .iter()
            .filter(|(_, stored)| stored.domain == domain)
            .collect();
        entries.sort_by_key(|(_, stored)| stored.seq);

        Ok(entries
            .into_iter()
            .map(|(&variant_id, stored)| VariantCandidate {
                variant_id,
                slug: stored.slug.clone(),
                label: stored.label.clone(),
                vector: stored.vector.clone(),
            })
            .collect())
    }
}
