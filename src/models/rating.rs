use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::taste::Domain;
use crate::error::{AppError, AppResult};

/// Coarse one-tap feedback a user can attach to a rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickFeedback {
    Sour,
    Balanced,
    Bitter,
}

/// A single star rating submitted for a product variant
///
/// Ephemeral input: the event itself is not part of the model state, only
/// the profile update it produces.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingEvent {
    pub user_id: Uuid,
    pub variant_id: Uuid,
    pub domain: Domain,
    pub stars: u8,
    #[serde(default)]
    pub quick: Option<QuickFeedback>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl RatingEvent {
    /// Rejects out-of-range input before any state is touched
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=5).contains(&self.stars) {
            return Err(AppError::InvalidInput(format!(
                "stars must be between 1 and 5, got {}",
                self.stars
            )));
        }
        Ok(())
    }
}
