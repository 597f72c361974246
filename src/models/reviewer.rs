//! Reviewer model.
//!
//! Reviewers have no upstream id. Identity is approximated by the pair
//! (display name, country name); two real people sharing both collapse into
//! one row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive reviewer attributes as found under `comment.reviewerInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewerInfo {
    pub display_name: Option<String>,
    pub country_name: Option<String>,
    pub flag_name: Option<String>,
    pub review_group_name: Option<String>,
    pub room_type_name: Option<String>,
    pub country_id: Option<i32>,
    pub length_of_stay: Option<i32>,
    pub review_group_id: Option<i32>,
    pub room_type_id: Option<i32>,
    pub reviewed_count: Option<i32>,
    pub is_expert_reviewer: Option<bool>,
    pub is_show_global_icon: Option<bool>,
    pub is_show_reviewed_count: Option<bool>,
}

impl ReviewerInfo {
    /// Natural key used for deduplication.
    ///
    /// Returns `None` unless both halves are present; such reviewers are
    /// always stored as new rows.
    pub fn natural_key(&self) -> Option<ReviewerKey> {
        match (&self.display_name, &self.country_name) {
            (Some(display_name), Some(country_name)) => Some(ReviewerKey {
                display_name: display_name.clone(),
                country_name: country_name.clone(),
            }),
            _ => None,
        }
    }
}

/// The (display name, country name) pair identifying a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewerKey {
    pub display_name: String,
    pub country_name: String,
}

/// A persisted reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    /// Locally assigned row id.
    pub id: i64,
    #[serde(flatten)]
    pub info: ReviewerInfo,
    pub created_at: DateTime<Utc>,
}
