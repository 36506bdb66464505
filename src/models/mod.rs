pub mod profile;
pub mod rating;
pub mod taste;

pub use profile::UserDomainProfile;
pub use rating::{QuickFeedback, RatingEvent};
pub use taste::{clamp01, Axis, Domain, TasteVector, SEED_CONFIDENCE};
