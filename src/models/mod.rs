//! Data models for imported hotel reviews.

mod reference;
mod review;
mod reviewer;

pub use reference::{Property, RatingProvider};
pub use review::{OverallByProvider, Review, ReviewDetails, ReviewGrade};
pub use reviewer::{Reviewer, ReviewerInfo, ReviewerKey};
