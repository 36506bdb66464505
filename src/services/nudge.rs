use crate::models::{clamp01, Axis, Domain, QuickFeedback, TasteVector};

/// How far a directional tag pulls the named axis of mu
const MU_NUDGE: f64 = 0.03;

/// Sigma shrink factor for the axis a directional tag names
const AXIS_SIGMA_SHRINK: f64 = 0.97;

/// Sigma shrink factor applied across all axes by a "balanced" tag
const BALANCED_SIGMA_SHRINK: f64 = 0.98;

/// Floor for nudge-layer sigma writes
///
/// Deliberately higher than the update engine's 0.08 floor; the two floors
/// are observable behavior and must not be unified.
pub const NUDGE_SIGMA_FLOOR: f64 = 0.10;

/// Applies a small deterministic correction from a coarse feedback tag
///
/// Runs only after the main update. "sour" and "bitter" pull the matching
/// axis of mu down slightly and tighten its sigma; "balanced" tightens
/// sigma on every axis and leaves mu alone. An absent tag is a no-op.
pub fn apply_quick_feedback(
    quick: Option<QuickFeedback>,
    domain: Domain,
    mu: &mut TasteVector,
    sigma: &mut TasteVector,
) {
    match quick {
        Some(QuickFeedback::Sour) => nudge_axis(Axis::Acidity, mu, sigma),
        Some(QuickFeedback::Bitter) => nudge_axis(Axis::Bitterness, mu, sigma),
        Some(QuickFeedback::Balanced) => {
            for &axis in domain.axes() {
                let shrunk = sigma.get(axis) * BALANCED_SIGMA_SHRINK;
                sigma.set(axis, shrunk.max(NUDGE_SIGMA_FLOOR));
            }
        }
        None => {}
    }
}

fn nudge_axis(axis: Axis, mu: &mut TasteVector, sigma: &mut TasteVector) {
    mu.set(axis, clamp01(mu.get(axis) - MU_NUDGE));
    let shrunk = sigma.get(axis) * AXIS_SIGMA_SHRINK;
    sigma.set(axis, shrunk.max(NUDGE_SIGMA_FLOOR));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_profile() -> (TasteVector, TasteVector) {
        (Domain::Coffee.default_mu(), Domain::Coffee.default_sigma())
    }

    #[test]
    fn test_sour_nudges_acidity() {
        let (mut mu, mut sigma) = fresh_profile();
        apply_quick_feedback(Some(QuickFeedback::Sour), Domain::Coffee, &mut mu, &mut sigma);

        assert!((mu.get(Axis::Acidity) - 0.47).abs() < 1e-12);
        assert!((sigma.get(Axis::Acidity) - 0.3395).abs() < 1e-12);
        // Other axes untouched
        assert_eq!(mu.get(Axis::Bitterness), 0.5);
        assert_eq!(sigma.get(Axis::Bitterness), 0.35);
    }

    #[test]
    fn test_bitter_nudges_bitterness() {
        let (mut mu, mut sigma) = fresh_profile();
        apply_quick_feedback(Some(QuickFeedback::Bitter), Domain::Coffee, &mut mu, &mut sigma);

        assert!((mu.get(Axis::Bitterness) - 0.47).abs() < 1e-12);
        assert!((sigma.get(Axis::Bitterness) - 0.3395).abs() < 1e-12);
        assert_eq!(mu.get(Axis::Acidity), 0.5);
    }

    #[test]
    fn test_balanced_tightens_every_axis_leaving_mu() {
        let (mut mu, mut sigma) = fresh_profile();
        let before = mu.clone();
        apply_quick_feedback(
            Some(QuickFeedback::Balanced),
            Domain::Coffee,
            &mut mu,
            &mut sigma,
        );

        assert_eq!(mu, before);
        for &axis in Domain::Coffee.axes() {
            assert!((sigma.get(axis) - 0.343).abs() < 1e-12);
        }
    }

    #[test]
    fn test_absent_tag_is_noop() {
        let (mut mu, mut sigma) = fresh_profile();
        let (mu_before, sigma_before) = (mu.clone(), sigma.clone());
        apply_quick_feedback(None, Domain::Coffee, &mut mu, &mut sigma);
        assert_eq!(mu, mu_before);
        assert_eq!(sigma, sigma_before);
    }

    #[test]
    fn test_nudge_floor_is_higher_than_engine_floor() {
        let mut mu = Domain::Coffee.default_mu();
        let mut sigma = TasteVector::default();
        for &axis in Domain::Coffee.axes() {
            sigma.set(axis, 0.101);
        }
        apply_quick_feedback(Some(QuickFeedback::Sour), Domain::Coffee, &mut mu, &mut sigma);
        assert_eq!(sigma.get(Axis::Acidity), NUDGE_SIGMA_FLOOR);
    }

    #[test]
    fn test_mu_clamped_at_zero() {
        let mut mu = Domain::Coffee.default_mu();
        mu.set(Axis::Acidity, 0.01);
        let mut sigma = Domain::Coffee.default_sigma();
        apply_quick_feedback(Some(QuickFeedback::Sour), Domain::Coffee, &mut mu, &mut sigma);
        assert_eq!(mu.get(Axis::Acidity), 0.0);
    }
}
