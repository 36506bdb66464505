use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{RatingEvent, UserDomainProfile};
use crate::stores::{ProfileStore, VariantVectorStore};

use super::engine::{self, PredictionDebug};
use super::nudge;

/// How many times a rating retries its compare-and-swap write before the
/// conflict is surfaced as a transient failure
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Runs the full rating pipeline: seed the variant vector, update the
/// profile from the rating, persist, then apply and persist any
/// quick-feedback nudge
///
/// The profile write is a read-modify-write against shared state, so it
/// runs under an optimistic-concurrency loop: a version mismatch re-reads
/// the profile and recomputes the update rather than clobbering a
/// concurrent rating.
pub async fn submit_rating(
    vectors: Arc<dyn VariantVectorStore>,
    profiles: Arc<dyn ProfileStore>,
    event: RatingEvent,
) -> AppResult<PredictionDebug> {
    event.validate()?;

    // 1. Community vector for the rated variant, seeded on first contact
    let seeded = vectors.get_or_seed(event.variant_id, event.domain).await?;

    // 2. Fill in descriptive metadata the caller happens to know
    if event.slug.is_some() || event.label.is_some() {
        vectors
            .update_metadata(event.variant_id, event.slug.clone(), event.label.clone())
            .await?;
    }

    // 3. Profile update under CAS retry
    let mut attempt = 0;
    let (prediction_debug, mut version) = loop {
        attempt += 1;

        let stored = profiles.get(event.user_id, event.domain).await?;
        let (profile, expected_version) = match stored {
            Some(stored) => (stored.profile, stored.version),
            None => (UserDomainProfile::seed(event.domain), 0),
        };

        let update = engine::apply_rating(
            event.domain,
            event.stars,
            &seeded.vector,
            &profile.mu,
            &profile.sigma,
            profile.beta,
        );
        let next = UserDomainProfile {
            mu: update.mu,
            sigma: update.sigma,
            beta: update.beta,
            ratings_count: profile.ratings_count,
        };

        match profiles
            .save_rated(event.user_id, event.domain, &next, expected_version)
            .await
        {
            Ok(version) => break (update.debug, version),
            Err(AppError::WriteConflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(
                    user_id = %event.user_id,
                    domain = %event.domain,
                    attempt,
                    reason = %reason,
                    "Profile write conflict, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    };

    // 4. Quick-feedback nudge, persisted separately and without touching
    //    the ratings count
    if let Some(quick) = event.quick {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let stored = profiles
                .get(event.user_id, event.domain)
                .await?
                .ok_or_else(|| {
                    AppError::Internal("profile disappeared between rating and nudge".to_string())
                })?;

            let mut mu = stored.profile.mu;
            let mut sigma = stored.profile.sigma;
            nudge::apply_quick_feedback(Some(quick), event.domain, &mut mu, &mut sigma);

            match profiles
                .save_nudged(event.user_id, event.domain, &mu, &sigma, stored.version)
                .await
            {
                Ok(new_version) => {
                    version = new_version;
                    break;
                }
                Err(AppError::WriteConflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(
                        user_id = %event.user_id,
                        domain = %event.domain,
                        attempt,
                        reason = %reason,
                        "Nudge write conflict, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(
        user_id = %event.user_id,
        variant_id = %event.variant_id,
        domain = %event.domain,
        stars = event.stars,
        y = prediction_debug.y,
        y_hat = prediction_debug.y_hat,
        d = prediction_debug.d,
        version,
        "Rating applied"
    );

    Ok(prediction_debug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Axis, Domain, QuickFeedback};
    use crate::stores::profiles::MockProfileStore;
    use crate::stores::{InMemoryProfileStore, InMemoryVariantVectorStore};
    use uuid::Uuid;

    fn event(user_id: Uuid, variant_id: Uuid, stars: u8) -> RatingEvent {
        RatingEvent {
            user_id,
            variant_id,
            domain: Domain::Coffee,
            stars,
            quick: None,
            slug: None,
            label: None,
        }
    }

    fn stores() -> (Arc<InMemoryVariantVectorStore>, Arc<InMemoryProfileStore>) {
        (
            Arc::new(InMemoryVariantVectorStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        )
    }

    #[tokio::test]
    async fn test_first_rating_matches_worked_scenario() {
        let (vectors, profiles) = stores();
        let user_id = Uuid::new_v4();

        let debug = submit_rating(
            vectors.clone(),
            profiles.clone(),
            event(user_id, Uuid::new_v4(), 5),
        )
        .await
        .unwrap();

        assert_eq!(debug.y, 1.0);
        assert!((debug.d - 0.1653).abs() < 5e-4);
        assert!((debug.y_hat - 0.4588).abs() < 5e-4);

        let stored = profiles.get(user_id, Domain::Coffee).await.unwrap().unwrap();
        assert_eq!(stored.profile.ratings_count, 1);
        assert!((stored.profile.beta - 0.0812).abs() < 5e-4);
        assert!((stored.profile.mu.get(Axis::Bitterness) - 0.5133).abs() < 5e-4);
    }

    #[tokio::test]
    async fn test_invalid_stars_leave_no_state() {
        let (vectors, profiles) = stores();
        let user_id = Uuid::new_v4();

        let result = submit_rating(
            vectors.clone(),
            profiles.clone(),
            event(user_id, Uuid::new_v4(), 6),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(profiles.get(user_id, Domain::Coffee).await.unwrap().is_none());
        assert!(vectors
            .list_by_domain(Domain::Coffee)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_quick_tag_nudges_after_update_without_double_counting() {
        let (vectors, profiles) = stores();
        let user_id = Uuid::new_v4();
        let variant_id = Uuid::new_v4();

        let mut with_quick = event(user_id, variant_id, 5);
        with_quick.quick = Some(QuickFeedback::Sour);
        submit_rating(vectors.clone(), profiles.clone(), with_quick)
            .await
            .unwrap();

        let stored = profiles.get(user_id, Domain::Coffee).await.unwrap().unwrap();
        // One rating, two persists: version advanced past the rating write
        assert_eq!(stored.profile.ratings_count, 1);
        assert_eq!(stored.version, 2);

        // Acidity pulled 0.03 below the engine's post-update value
        let engine_only = {
            let (vectors2, profiles2) = stores();
            submit_rating(vectors2, profiles2.clone(), event(user_id, variant_id, 5))
                .await
                .unwrap();
            profiles2
                .get(user_id, Domain::Coffee)
                .await
                .unwrap()
                .unwrap()
        };
        let expected = (engine_only.profile.mu.get(Axis::Acidity) - 0.03).clamp(0.0, 1.0);
        assert!((stored.profile.mu.get(Axis::Acidity) - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_metadata_filled_on_submission() {
        let (vectors, profiles) = stores();
        let variant_id = Uuid::new_v4();

        let mut with_meta = event(Uuid::new_v4(), variant_id, 4);
        with_meta.slug = Some("kenya-aa".to_string());
        with_meta.label = Some("Kenya AA".to_string());
        submit_rating(vectors.clone(), profiles, with_meta)
            .await
            .unwrap();

        let candidates = vectors.list_by_domain(Domain::Coffee).await.unwrap();
        assert_eq!(candidates[0].slug.as_deref(), Some("kenya-aa"));
        assert_eq!(candidates[0].label.as_deref(), Some("Kenya AA"));
    }

    #[tokio::test]
    async fn test_concurrent_ratings_both_land() {
        let (vectors, profiles) = stores();
        let user_id = Uuid::new_v4();
        let variant_id = Uuid::new_v4();

        let first = tokio::spawn(submit_rating(
            vectors.clone(),
            profiles.clone(),
            event(user_id, variant_id, 5),
        ));
        let second = tokio::spawn(submit_rating(
            vectors.clone(),
            profiles.clone(),
            event(user_id, variant_id, 4),
        ));

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let stored = profiles.get(user_id, Domain::Coffee).await.unwrap().unwrap();
        assert_eq!(stored.profile.ratings_count, 2);
    }

    #[tokio::test]
    async fn test_conflict_exhaustion_surfaces_transient_failure() {
        let vectors = Arc::new(InMemoryVariantVectorStore::new());

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_get()
            .times(3)
            .returning(|_, _| Ok(None));
        profiles
            .expect_save_rated()
            .times(3)
            .returning(|_, _, _, _| {
                Err(AppError::WriteConflict("simulated contention".to_string()))
            });

        let result = submit_rating(
            vectors,
            Arc::new(profiles),
            event(Uuid::new_v4(), Uuid::new_v4(), 5),
        )
        .await;
        assert!(matches!(result, Err(AppError::WriteConflict(_))));
    }
}
