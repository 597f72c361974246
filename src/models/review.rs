//! Review models: the review itself plus its per-category grades and the
//! aggregate scores other providers report for it.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Scalar review attributes copied from the `comment` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewDetails {
    pub rating: Option<f64>,
    pub check_in_month_year: Option<String>,
    pub encrypted_review_data: Option<String>,
    pub formatted_rating: Option<String>,
    pub formatted_review_date: Option<String>,
    pub rating_text: Option<String>,
    pub responder_name: Option<String>,
    pub response_date_text: Option<String>,
    pub response_translate_source: Option<String>,
    pub review_comments: Option<String>,
    pub review_negatives: Option<String>,
    pub review_positives: Option<String>,
    pub review_provider_logo: Option<String>,
    pub review_provider_text: Option<String>,
    pub review_title: Option<String>,
    pub translate_source: Option<String>,
    pub translate_target: Option<String>,
    pub review_date: Option<DateTime<FixedOffset>>,
    pub original_title: Option<String>,
    pub original_comment: Option<String>,
    pub formatted_response_date: Option<String>,
    pub is_show_review_response: Option<bool>,
}

/// A review linked to its property, originating provider and reviewer.
///
/// The id is the upstream `hotelReviewId` and is the only dedup key: once a
/// review with a given id exists, later lines carrying it are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub property_id: i64,
    pub provider_id: i64,
    pub reviewer_id: i64,
    #[serde(flatten)]
    pub details: ReviewDetails,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        id: i64,
        property_id: i64,
        provider_id: i64,
        reviewer_id: i64,
        details: ReviewDetails,
    ) -> Self {
        Self {
            id,
            property_id,
            provider_id,
            reviewer_id,
            details,
            created_at: Utc::now(),
        }
    }
}

/// One category score of a review (e.g. "Cleanliness" -> 8.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewGrade {
    pub review_id: i64,
    pub category: String,
    pub score: f64,
}

/// How another provider rates the same review's property.
///
/// Distinct from the review's own originating provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallByProvider {
    pub review_id: i64,
    pub provider_id: i64,
    pub overall_score: Option<f64>,
    pub review_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl OverallByProvider {
    pub fn new(
        review_id: i64,
        provider_id: i64,
        overall_score: Option<f64>,
        review_count: Option<i32>,
    ) -> Self {
        Self {
            review_id,
            provider_id,
            overall_score,
            review_count,
            created_at: Utc::now(),
        }
    }
}
