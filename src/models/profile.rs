use serde::{Deserialize, Serialize};

use super::taste::{Domain, TasteVector};

/// A user's learned preference state for one domain
///
/// `mu` is the believed preferred vector, `sigma` the per-axis uncertainty
/// (lower = more confident), `beta` a scalar bias shifting predicted
/// satisfaction independent of axis distance. One record per
/// `(user, domain)`, created lazily on the first rating and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDomainProfile {
    pub mu: TasteVector,
    pub sigma: TasteVector,
    pub beta: f64,
    pub ratings_count: i32,
}

impl UserDomainProfile {
    /// The profile a first-time rater starts from
    pub fn seed(domain: Domain) -> Self {
        Self {
            mu: domain.default_mu(),
            sigma: domain.default_sigma(),
            beta: 0.0,
            ratings_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taste::Axis;

    #[test]
    fn test_seed_profile_defaults() {
        let profile = UserDomainProfile::seed(Domain::Coffee);
        assert_eq!(profile.mu.get(Axis::Sweetness), 0.4);
        assert_eq!(profile.sigma.get(Axis::Bitterness), 0.35);
        assert_eq!(profile.beta, 0.0);
        assert_eq!(profile.ratings_count, 0);
    }

    #[test]
    fn test_tea_seed_carries_astringency() {
        let profile = UserDomainProfile::seed(Domain::Tea);
        assert_eq!(profile.mu.get(Axis::Astringency), 0.5);
        assert_eq!(profile.sigma.get(Axis::Astringency), 0.35);
    }
}
