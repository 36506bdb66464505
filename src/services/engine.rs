use serde::{Deserialize, Serialize};

use crate::models::{clamp01, Domain, TasteVector};

/// Guard against division by a near-zero variance
pub const EPS: f64 = 1e-6;

/// Per-axis learning rate for the mu update
pub const LEARNING_RATE: f64 = 0.06;

/// Uniform sigma shrink factor per unit of absolute prediction error
pub const SIGMA_SHRINK: f64 = 0.04;

/// Learning rate for the scalar bias term
pub const BETA_LEARNING_RATE: f64 = 0.15;

/// Hard floor sigma can never drop below
pub const SIGMA_FLOOR: f64 = 0.08;

/// Prediction internals returned alongside every update, for
/// observability and testing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionDebug {
    /// Star rating mapped onto [0,1]
    pub y: f64,
    /// Predicted satisfaction probability, strictly inside (0,1)
    pub y_hat: f64,
    /// Weighted squared distance between the variant vector and mu
    pub d: f64,
}

/// Result of applying one rating to a profile
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub mu: TasteVector,
    pub sigma: TasteVector,
    pub beta: f64,
    pub debug: PredictionDebug,
}

/// Applies one star rating to a profile, producing updated
/// `(mu, sigma, beta)` and the prediction internals
///
/// Pure and deterministic: all persistence is the caller's responsibility.
/// The update is an online gradient step on the weighted distance between
/// the variant's community vector `p` and the believed preference `mu`,
/// with per-axis variance `sigma` shrinking uniformly whenever a rating
/// lands (less for well-predicted ratings, since the factor scales with
/// the absolute error).
pub fn apply_rating(
    domain: Domain,
    stars: u8,
    p: &TasteVector,
    mu: &TasteVector,
    sigma: &TasteVector,
    beta: f64,
) -> RatingUpdate {
    // 1. Map the 1..5 star scale onto [0,1]
    let y = (f64::from(stars) - 1.0) / 4.0;

    // 2. Weighted squared distance, sigma floored before use so a corrupt
    //    or pre-floor stored record cannot blow up the division
    let mut d = 0.0;
    for &axis in domain.axes() {
        let weight = domain.weight(axis);
        let diff = p.get(axis) - mu.get(axis);
        let variance = floored(sigma.get(axis)).powi(2) + EPS;
        d += weight * diff * diff / variance;
    }

    // 3. Predicted satisfaction
    let y_hat = sigmoid(beta - d);

    // 4. Prediction error
    let err = y - y_hat;

    // 5. Per-axis updates
    let mut new_mu = TasteVector::default();
    let mut new_sigma = TasteVector::default();
    for &axis in domain.axes() {
        let weight = domain.weight(axis);
        let diff = p.get(axis) - mu.get(axis);
        let floored_sigma = floored(sigma.get(axis));
        let variance = floored_sigma.powi(2) + EPS;

        let grad = err * weight * diff / variance;
        new_mu.set(axis, clamp01(mu.get(axis) + LEARNING_RATE * grad));

        // The shrink factor is uniform across axes: confidence tightens
        // globally whenever a rating is close to predicted
        let shrunk = floored_sigma * (1.0 - SIGMA_SHRINK * err.abs());
        new_sigma.set(axis, shrunk.max(SIGMA_FLOOR));
    }

    // 6. Bias update
    let new_beta = beta + BETA_LEARNING_RATE * err;

    RatingUpdate {
        mu: new_mu,
        sigma: new_sigma,
        beta: new_beta,
        debug: PredictionDebug { y, y_hat, d },
    }
}

fn floored(sigma: f64) -> f64 {
    sigma.max(SIGMA_FLOOR)
}

/// Numerically stable sigmoid: branches on the sign of `z` so `exp` never
/// overflows
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Axis;

    const TOLERANCE: f64 = 5e-4;

    fn worked_scenario_inputs() -> (TasteVector, TasteVector, TasteVector) {
        let p = TasteVector::from_pairs(&[
            (Axis::Bitterness, 0.55),
            (Axis::Acidity, 0.45),
            (Axis::Sweetness, 0.35),
            (Axis::Body, 0.55),
            (Axis::Aroma, 0.6),
            (Axis::Clarity, 0.45),
        ]);
        let mu = Domain::Coffee.default_mu();
        let sigma = Domain::Coffee.default_sigma();
        (p, mu, sigma)
    }

    #[test]
    fn test_worked_scenario_first_coffee_rating() {
        let (p, mu, sigma) = worked_scenario_inputs();
        let update = apply_rating(Domain::Coffee, 5, &p, &mu, &sigma, 0.0);

        assert!((update.debug.d - 0.1653).abs() < TOLERANCE);
        assert!((update.debug.y_hat - 0.4588).abs() < TOLERANCE);
        assert_eq!(update.debug.y, 1.0);

        assert!((update.mu.get(Axis::Bitterness) - 0.5133).abs() < TOLERANCE);
        assert!((update.mu.get(Axis::Acidity) - 0.4867).abs() < TOLERANCE);
        assert!((update.mu.get(Axis::Sweetness) - 0.3894).abs() < TOLERANCE);
        assert!((update.mu.get(Axis::Body) - 0.5133).abs() < TOLERANCE);
        assert!((update.mu.get(Axis::Aroma) - 0.5239).abs() < TOLERANCE);
        assert!((update.mu.get(Axis::Clarity) - 0.4907).abs() < TOLERANCE);

        for &axis in Domain::Coffee.axes() {
            assert!((update.sigma.get(axis) - 0.3424).abs() < TOLERANCE);
        }
        assert!((update.beta - 0.0812).abs() < TOLERANCE);
    }

    #[test]
    fn test_y_hat_strictly_between_zero_and_one() {
        let (p, mu, sigma) = worked_scenario_inputs();
        for stars in 1..=5 {
            for beta in [-50.0, -1.0, 0.0, 1.0, 50.0] {
                let update = apply_rating(Domain::Coffee, stars, &p, &mu, &sigma, beta);
                assert!(update.debug.y_hat > 0.0);
                assert!(update.debug.y_hat < 1.0);
            }
        }
    }

    #[test]
    fn test_repeated_five_star_ratings_shrink_distance() {
        let (p, mut mu, mut sigma) = worked_scenario_inputs();
        let mut beta = 0.0;
        let mut last_d = f64::MAX;

        for _ in 0..6 {
            let update = apply_rating(Domain::Coffee, 5, &p, &mu, &sigma, beta);
            assert!(update.debug.d < last_d);
            last_d = update.debug.d;
            mu = update.mu;
            sigma = update.sigma;
            beta = update.beta;
        }
    }

    #[test]
    fn test_outputs_stay_in_bounds_under_extreme_inputs() {
        // Extreme variant vector against an opposite profile, repeatedly
        let p = TasteVector::from_pairs(&[
            (Axis::Bitterness, 1.0),
            (Axis::Acidity, 0.0),
            (Axis::Sweetness, 1.0),
            (Axis::Body, 0.0),
            (Axis::Aroma, 1.0),
            (Axis::Clarity, 0.0),
        ]);
        let mut mu = TasteVector::from_pairs(&[
            (Axis::Bitterness, 0.0),
            (Axis::Acidity, 1.0),
            (Axis::Sweetness, 0.0),
            (Axis::Body, 1.0),
            (Axis::Aroma, 0.0),
            (Axis::Clarity, 1.0),
        ]);
        let mut sigma = Domain::Coffee.default_sigma();
        let mut beta = 0.0;

        for stars in [5, 1, 5, 5, 1, 5, 5, 5, 1, 5] {
            let update = apply_rating(Domain::Coffee, stars, &p, &mu, &sigma, beta);
            for &axis in Domain::Coffee.axes() {
                let m = update.mu.get(axis);
                assert!((0.0..=1.0).contains(&m));
                assert!(update.sigma.get(axis) >= SIGMA_FLOOR);
            }
            mu = update.mu;
            sigma = update.sigma;
            beta = update.beta;
        }
    }

    #[test]
    fn test_sigma_floored_before_use_on_corrupt_record() {
        let (p, mu, _) = worked_scenario_inputs();
        let mut corrupt = TasteVector::default();
        for &axis in Domain::Coffee.axes() {
            corrupt.set(axis, 0.01); // below the floor, as an old record might store
        }

        let update = apply_rating(Domain::Coffee, 3, &p, &mu, &corrupt, 0.0);
        // D must reflect the floored sigma, not the stored one
        let mut expected_d = 0.0;
        for &axis in Domain::Coffee.axes() {
            let diff = p.get(axis) - mu.get(axis);
            expected_d += Domain::Coffee.weight(axis) * diff * diff / (SIGMA_FLOOR.powi(2) + EPS);
        }
        assert!((update.debug.d - expected_d).abs() < 1e-9);
        for &axis in Domain::Coffee.axes() {
            assert!(update.sigma.get(axis) >= SIGMA_FLOOR);
        }
    }

    #[test]
    fn test_y_hat_is_half_at_zero_logit() {
        // beta exactly equal to D makes z = 0
        let (p, mu, sigma) = worked_scenario_inputs();
        let probe = apply_rating(Domain::Coffee, 3, &p, &mu, &sigma, 0.0);
        let update = apply_rating(Domain::Coffee, 3, &p, &mu, &sigma, probe.debug.d);
        assert!((update.debug.y_hat - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tea_domain_updates_astringency() {
        let p = Domain::Tea.default_vector();
        let mu = Domain::Tea.default_mu();
        let sigma = Domain::Tea.default_sigma();
        let update = apply_rating(Domain::Tea, 5, &p, &mu, &sigma, 0.0);
        assert!(update.mu.contains(Axis::Astringency));
        assert!(update.sigma.get(Axis::Astringency) < 0.35);
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let (p, mu, sigma) = worked_scenario_inputs();
        let first = apply_rating(Domain::Coffee, 4, &p, &mu, &sigma, 0.1);
        let second = apply_rating(Domain::Coffee, 4, &p, &mu, &sigma, 0.1);
        assert_eq!(first, second);
    }
}
