use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Confidence assigned to a community vector seeded from domain defaults
pub const SEED_CONFIDENCE: f64 = 0.2;

/// One named scalar dimension of a taste vector
///
/// Wire keys are single letters to keep stored vectors compact; the full
/// names are used for human-facing output (e.g. sensitivity insights).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "b")]
    Bitterness,
    #[serde(rename = "a")]
    Acidity,
    #[serde(rename = "s")]
    Sweetness,
    #[serde(rename = "m")]
    Body,
    #[serde(rename = "r")]
    Aroma,
    #[serde(rename = "c")]
    Clarity,
    /// Tea only
    #[serde(rename = "t")]
    Astringency,
}

impl Axis {
    /// Human-readable name for insight payloads
    pub fn label(&self) -> &'static str {
        match self {
            Axis::Bitterness => "bitterness",
            Axis::Acidity => "acidity",
            Axis::Sweetness => "sweetness",
            Axis::Body => "body",
            Axis::Aroma => "aroma",
            Axis::Clarity => "clarity",
            Axis::Astringency => "astringency",
        }
    }
}

/// Product domain a rating or recommendation request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Coffee,
    Tea,
}

const COFFEE_AXES: [Axis; 6] = [
    Axis::Bitterness,
    Axis::Acidity,
    Axis::Sweetness,
    Axis::Body,
    Axis::Aroma,
    Axis::Clarity,
];

const TEA_AXES: [Axis; 7] = [
    Axis::Bitterness,
    Axis::Acidity,
    Axis::Sweetness,
    Axis::Body,
    Axis::Aroma,
    Axis::Clarity,
    Axis::Astringency,
];

impl Domain {
    /// The fixed axis set for this domain
    pub fn axes(&self) -> &'static [Axis] {
        match self {
            Domain::Coffee => &COFFEE_AXES,
            Domain::Tea => &TEA_AXES,
        }
    }

    /// Per-axis weight used by both the update engine and the recommender
    ///
    /// Coffee weights acidity/bitterness/body at 1.0; tea weights
    /// clarity/aroma/astringency highest. Asking for an axis outside the
    /// domain's axis set is a programming error.
    pub fn weight(&self, axis: Axis) -> f64 {
        let weight = match self {
            Domain::Coffee => match axis {
                Axis::Bitterness => Some(1.0),
                Axis::Acidity => Some(1.0),
                Axis::Sweetness => Some(0.8),
                Axis::Body => Some(1.0),
                Axis::Aroma => Some(0.9),
                Axis::Clarity => Some(0.7),
                Axis::Astringency => None,
            },
            Domain::Tea => match axis {
                Axis::Bitterness => Some(0.8),
                Axis::Acidity => Some(0.9),
                Axis::Sweetness => Some(0.7),
                Axis::Body => Some(0.9),
                Axis::Aroma => Some(1.0),
                Axis::Clarity => Some(1.0),
                Axis::Astringency => Some(1.0),
            },
        };
        weight.unwrap_or_else(|| panic!("axis {axis:?} is not in the {self} axis set"))
    }

    /// Sum of all axis weights for this domain
    pub fn weight_sum(&self) -> f64 {
        self.axes().iter().map(|&axis| self.weight(axis)).sum()
    }

    /// Community taste vector used when a variant is rated before anyone
    /// has estimated its profile
    pub fn default_vector(&self) -> TasteVector {
        match self {
            Domain::Coffee => TasteVector::from_pairs(&[
                (Axis::Bitterness, 0.55),
                (Axis::Acidity, 0.45),
                (Axis::Sweetness, 0.35),
                (Axis::Body, 0.55),
                (Axis::Aroma, 0.6),
                (Axis::Clarity, 0.45),
            ]),
            Domain::Tea => TasteVector::from_pairs(&[
                (Axis::Bitterness, 0.45),
                (Axis::Acidity, 0.4),
                (Axis::Sweetness, 0.35),
                (Axis::Body, 0.5),
                (Axis::Aroma, 0.55),
                (Axis::Clarity, 0.6),
                (Axis::Astringency, 0.5),
            ]),
        }
    }

    /// Initial believed-preference vector for a brand new profile
    pub fn default_mu(&self) -> TasteVector {
        let mut mu = TasteVector::default();
        for &axis in self.axes() {
            let value = if axis == Axis::Sweetness { 0.4 } else { 0.5 };
            mu.set(axis, value);
        }
        mu
    }

    /// Initial per-axis uncertainty for a brand new profile
    pub fn default_sigma(&self) -> TasteVector {
        let mut sigma = TasteVector::default();
        for &axis in self.axes() {
            sigma.set(axis, 0.35);
        }
        sigma
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Coffee => "coffee",
            Domain::Tea => "tea",
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coffee" => Ok(Domain::Coffee),
            "tea" => Ok(Domain::Tea),
            other => Err(format!("unknown domain: {other}")),
        }
    }
}

/// Mapping from axis to a `[0,1]` value describing a flavor profile,
/// either a product's community estimate or a user's preferred one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TasteVector(BTreeMap<Axis, f64>);

impl TasteVector {
    /// Builds a vector from explicit axis/value pairs
    pub fn from_pairs(pairs: &[(Axis, f64)]) -> Self {
        Self(pairs.iter().copied().collect())
    }

    /// Returns the value for an axis
    ///
    /// Panics when the axis is absent: callers only look up axes from the
    /// owning domain's axis set, so a miss is a programming error.
    pub fn get(&self, axis: Axis) -> f64 {
        *self
            .0
            .get(&axis)
            .unwrap_or_else(|| panic!("axis {axis:?} missing from taste vector"))
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        self.0.insert(axis, value);
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.0.contains_key(&axis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        self.0.iter().map(|(&axis, &value)| (axis, value))
    }
}

/// Clamps a value to the `[0,1]` range every stored axis value lives in
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
