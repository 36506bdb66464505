pub mod engine;
pub mod insights;
pub mod nudge;
pub mod ratings;
pub mod recommender;

pub use engine::PredictionDebug;
pub use recommender::RankedVariant;
