use crate::models::{Axis, UserDomainProfile};

/// Ratings a user must have submitted in a domain before sensitivity
/// insights are reported
pub const SENSITIVITY_MIN_RATINGS: i32 = 3;

/// Names the axis the user is most sensitive to, if known
///
/// Compares the acidity and bitterness uncertainties: a lower sigma means
/// a more peaked, confident preference on that axis. Gated on rating
/// volume so a barely-trained profile never reports an insight, whatever
/// its sigma values happen to be.
pub fn most_sensitive(profile: &UserDomainProfile) -> Option<&'static str> {
    if profile.ratings_count < SENSITIVITY_MIN_RATINGS {
        return None;
    }

    if profile.sigma.get(Axis::Acidity) < profile.sigma.get(Axis::Bitterness) {
        Some(Axis::Acidity.label())
    } else {
        Some(Axis::Bitterness.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Domain;

    fn profile_with(sigma_a: f64, sigma_b: f64, ratings_count: i32) -> UserDomainProfile {
        let mut profile = UserDomainProfile::seed(Domain::Coffee);
        profile.sigma.set(Axis::Acidity, sigma_a);
        profile.sigma.set(Axis::Bitterness, sigma_b);
        profile.ratings_count = ratings_count;
        profile
    }

    #[test]
    fn test_gated_below_three_ratings() {
        assert_eq!(most_sensitive(&profile_with(0.10, 0.35, 2)), None);
        assert_eq!(most_sensitive(&profile_with(0.10, 0.35, 0)), None);
    }

    #[test]
    fn test_lower_acidity_sigma_reports_acidity() {
        assert_eq!(most_sensitive(&profile_with(0.30, 0.32, 3)), Some("acidity"));
    }

    #[test]
    fn test_lower_bitterness_sigma_reports_bitterness() {
        assert_eq!(
            most_sensitive(&profile_with(0.32, 0.30, 5)),
            Some("bitterness")
        );
    }
}
