use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cached;
use crate::db::CacheKey;
use crate::error::{AppError, AppResult};
use crate::models::{Domain, RatingEvent, TasteVector, UserDomainProfile};
use crate::services::{insights, ratings, recommender, PredictionDebug, RankedVariant};

use super::AppState;

/// Recommendations returned when the caller does not ask for a count
const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// Upper bound on how many recommendations one request may ask for
const MAX_RECOMMENDATION_LIMIT: usize = 30;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub domain: Domain,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub domain: Domain,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub items: Vec<RankedVariant>,
    /// Set on cold start, when the user has no profile in the domain yet
    pub note: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensitivityResponse {
    pub most_sensitive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileSummaryResponse {
    pub mu: TasteVector,
    pub sigma: TasteVector,
    pub confidence_count: i32,
    pub sensitivity: SensitivityResponse,
}

impl From<&UserDomainProfile> for ProfileSummaryResponse {
    fn from(profile: &UserDomainProfile) -> Self {
        Self {
            mu: profile.mu.clone(),
            sigma: profile.sigma.clone(),
            confidence_count: profile.ratings_count,
            sensitivity: SensitivityResponse {
                most_sensitive: insights::most_sensitive(profile).map(str::to_string),
            },
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Submit one star rating, returning the prediction internals
pub async fn submit_rating(
    State(state): State<AppState>,
    Json(event): Json<RatingEvent>,
) -> AppResult<Json<PredictionDebug>> {
    let (user_id, domain) = (event.user_id, event.domain);
    let debug = ratings::submit_rating(state.vectors.clone(), state.profiles.clone(), event).await?;

    // Cached read views are stale the moment a rating lands
    if let Some(cache) = &state.cache {
        cache.invalidate_in_background(&CacheKey::Recommendations(user_id, domain));
        cache.invalidate_in_background(&CacheKey::ProfileSummary(user_id, domain));
    }

    Ok(Json(debug))
}

/// Rank the domain catalog against the user's learned profile
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<RecommendationsQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let domain = params.domain;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT)
        .clamp(1, MAX_RECOMMENDATION_LIMIT);

    let Some(stored) = state.profiles.get(user_id, domain).await? else {
        // Cold start is a normal case, not a failure
        return Ok(Json(RecommendationsResponse {
            items: Vec::new(),
            note: Some(format!(
                "no {domain} ratings yet for this user; submit a rating to start building a profile"
            )),
            generated_at: Utc::now(),
        }));
    };

    let mu = stored.profile.mu;
    let vectors = state.vectors.clone();
    let key = CacheKey::Recommendations(user_id, domain);
    // The full ranked list is cached; per-request limits truncate it
    let full: RecommendationsResponse =
        cached!(state.cache.as_ref(), key, state.cache_ttl_secs, async {
            let candidates = vectors.list_by_domain(domain).await?;
            let items = recommender::rank(domain, &mu, &candidates, MAX_RECOMMENDATION_LIMIT);
            Ok::<_, AppError>(RecommendationsResponse {
                items,
                note: None,
                generated_at: Utc::now(),
            })
        })?;

    let mut items = full.items;
    items.truncate(limit);
    Ok(Json(RecommendationsResponse {
        items,
        note: full.note,
        generated_at: full.generated_at,
    }))
}

/// Current profile state plus derived sensitivity insight
pub async fn get_profile_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ProfileQuery>,
) -> AppResult<Json<ProfileSummaryResponse>> {
    let domain = params.domain;
    let profiles = state.profiles.clone();
    let key = CacheKey::ProfileSummary(user_id, domain);

    let summary: ProfileSummaryResponse =
        cached!(state.cache.as_ref(), key, state.cache_ttl_secs, async {
            let profile = match profiles.get(user_id, domain).await? {
                Some(stored) => stored.profile,
                // Cold start reports the domain defaults with zero confidence
                None => UserDomainProfile::seed(domain),
            };
            Ok::<_, AppError>(ProfileSummaryResponse::from(&profile))
        })?;

    Ok(Json(summary))
}
