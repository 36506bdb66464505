use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Domain, TasteVector};
use crate::stores::variant_vectors::VariantCandidate;

/// A candidate variant with its closeness score against a user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVariant {
    pub variant_id: Uuid,
    pub slug: Option<String>,
    pub label: Option<String>,
    pub score: f64,
}

/// Ranks catalog variants against a user's preferred vector
///
/// Scoring is deliberately simpler than the update engine's likelihood: a
/// weighted L1 distance normalized by the weight sum, so `score == 1.0`
/// exactly when the candidate matches mu on every axis and never drops
/// below 0 for in-range vectors. The sort is stable, so equal scores keep
/// their input order. Read-only: never touches the profile.
pub fn rank(
    domain: Domain,
    mu: &TasteVector,
    candidates: &[VariantCandidate],
    limit: usize,
) -> Vec<RankedVariant> {
    let weight_sum = domain.weight_sum();

    let mut ranked: Vec<RankedVariant> = candidates
        .iter()
        .map(|candidate| RankedVariant {
            variant_id: candidate.variant_id,
            slug: candidate.slug.clone(),
            label: candidate.label.clone(),
            score: score(domain, mu, &candidate.vector, weight_sum),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

fn score(domain: Domain, mu: &TasteVector, p: &TasteVector, weight_sum: f64) -> f64 {
    let mut distance = 0.0;
    for &axis in domain.axes() {
        distance += domain.weight(axis) * (mu.get(axis) - p.get(axis)).abs();
    }
    1.0 - distance / weight_sum
}
