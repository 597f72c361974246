//! Line processor: one JL line in, one validated record set out.
//!
//! A line looks like
//!
//! ```json
//! {"hotelId": 1, "hotelName": "Test Hotel",
//!  "comment": {"hotelReviewId": 100, "providerId": 5, "reviewProviderText": "Expedia",
//!              "rating": 4.5, "reviewDate": "2025-01-01T00:00:00+00:00",
//!              "reviewerInfo": {"displayMemberName": "Jane", "countryName": "US"}},
//!  "overallByProviders": [{"providerId": 7, "provider": "Agoda", "overallScore": 8.1,
//!                          "reviewCount": 120, "grades": {"Cleanliness": 8.6}}]}
//! ```
//!
//! Parsing never touches the store. Everything that can be rejected is
//! rejected here, before any reference data is written.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::{Property, RatingProvider, ReviewDetails, ReviewerInfo};

#[derive(Debug, Error)]
pub enum LineError {
    #[error("Malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Every missing field of the line, in configuration order.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Invalid record: {0}")]
    Invalid(String),
}

/// Field names that must be present and non-null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredFields {
    /// Keys of the top-level object.
    pub top_level: Vec<String>,
    /// Keys of the nested `comment` object.
    pub comment: Vec<String>,
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self {
            top_level: ["hotelId", "hotelName", "comment"]
                .into_iter()
                .map(String::from)
                .collect(),
            comment: [
                "hotelReviewId",
                "providerId",
                "rating",
                "reviewComments",
                "reviewDate",
                "reviewerInfo",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RequiredFields {
    /// Names of all missing fields; comment fields are prefixed `comment.`.
    pub fn missing(&self, root: &Map<String, Value>) -> Vec<String> {
        let mut missing: Vec<String> = self
            .top_level
            .iter()
            .filter(|f| !has_non_null(root, f))
            .cloned()
            .collect();

        let comment = root.get("comment").and_then(Value::as_object);
        missing.extend(
            self.comment
                .iter()
                .filter(|f| comment.map_or(true, |c| !has_non_null(c, f)))
                .map(|f| format!("comment.{f}")),
        );
        missing
    }
}

/// An `overallByProviders` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallEntry {
    pub provider: RatingProvider,
    pub overall_score: Option<f64>,
    pub review_count: Option<i32>,
    /// Category scores, ordered by category name.
    pub grades: Vec<(String, f64)>,
}

/// Everything extracted from one valid line, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub review_id: i64,
    pub property: Property,
    /// The review's own originating provider.
    pub provider: RatingProvider,
    pub reviewer: ReviewerInfo,
    pub details: ReviewDetails,
    pub overalls: Vec<OverallEntry>,
}

/// Parse and validate one line. `line_no` is 1-based and used only in
/// diagnostics.
pub fn parse_line(
    line: &str,
    line_no: usize,
    required: &RequiredFields,
) -> Result<ParsedLine, LineError> {
    let root: Value = serde_json::from_str(line)?;
    let root = root
        .as_object()
        .ok_or_else(|| LineError::Invalid("line is not a JSON object".into()))?;

    let missing = required.missing(root);
    if !missing.is_empty() {
        return Err(LineError::MissingFields(missing));
    }

    let comment = root
        .get("comment")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("comment is not an object"))?;

    let property = Property::new(require_id(root, "hotelId")?, text(root, "hotelName"));
    let provider = RatingProvider::new(
        require_id(comment, "providerId")?,
        text(comment, "reviewProviderText")
            .ok_or_else(|| invalid("comment.reviewProviderText is missing"))?,
    );
    let review_id = require_id(comment, "hotelReviewId")?;
    let reviewer = comment
        .get("reviewerInfo")
        .and_then(Value::as_object)
        .map(reviewer_info)
        .ok_or_else(|| invalid("comment.reviewerInfo is not an object"))?;

    let details = review_details(comment, line_no);
    let overalls = match root.get("overallByProviders") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(overall_entry)
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid("overallByProviders is not an array")),
    };

    Ok(ParsedLine {
        review_id,
        property,
        provider,
        reviewer,
        details,
        overalls,
    })
}

fn invalid(msg: &str) -> LineError {
    LineError::Invalid(msg.to_string())
}

fn has_non_null(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

fn require_id(obj: &Map<String, Value>, key: &str) -> Result<i64, LineError> {
    obj.get(key)
        .and_then(as_i64)
        .ok_or_else(|| LineError::Invalid(format!("{key} is missing or not an integer")))
}

/// Integers, whole-valued floats such as `100.0`, or strings holding an
/// integer. Upstream exports are not consistent.
fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64_to_i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn whole_f64_to_i64(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        other => Some(other.to_string()),
    }
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(as_f64)
}

fn int(obj: &Map<String, Value>, key: &str) -> Option<i32> {
    obj.get(key)
        .and_then(as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn flag(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(as_bool)
}

fn reviewer_info(info: &Map<String, Value>) -> ReviewerInfo {
    ReviewerInfo {
        display_name: text(info, "displayMemberName"),
        country_name: text(info, "countryName"),
        flag_name: text(info, "flagName"),
        review_group_name: text(info, "reviewGroupName"),
        room_type_name: text(info, "roomTypeName"),
        country_id: int(info, "countryId"),
        length_of_stay: int(info, "lengthOfStay"),
        review_group_id: int(info, "reviewGroupId"),
        room_type_id: int(info, "roomTypeId"),
        reviewed_count: int(info, "reviewerReviewedCount"),
        is_expert_reviewer: flag(info, "isExpertReviewer"),
        is_show_global_icon: flag(info, "isShowGlobalIcon"),
        is_show_reviewed_count: flag(info, "isShowReviewedCount"),
    }
}

fn review_details(comment: &Map<String, Value>, line_no: usize) -> ReviewDetails {
    ReviewDetails {
        rating: number(comment, "rating"),
        check_in_month_year: text(comment, "checkInDateMonthAndYear"),
        encrypted_review_data: text(comment, "encryptedReviewData"),
        formatted_rating: text(comment, "formattedRating"),
        formatted_review_date: text(comment, "formattedReviewDate"),
        rating_text: text(comment, "ratingText"),
        responder_name: text(comment, "responderName"),
        response_date_text: text(comment, "responseDateText"),
        response_translate_source: text(comment, "responseTranslateSource"),
        review_comments: text(comment, "reviewComments"),
        review_negatives: text(comment, "reviewNegatives"),
        review_positives: text(comment, "reviewPositives"),
        review_provider_logo: text(comment, "reviewProviderLogo"),
        review_provider_text: text(comment, "reviewProviderText"),
        review_title: text(comment, "reviewTitle"),
        translate_source: text(comment, "translateSource"),
        translate_target: text(comment, "translateTarget"),
        review_date: review_date(comment, line_no),
        original_title: text(comment, "originalTitle"),
        original_comment: text(comment, "originalComment"),
        formatted_response_date: text(comment, "formattedResponseDate"),
        is_show_review_response: flag(comment, "isShowReviewResponse"),
    }
}

fn review_date(comment: &Map<String, Value>, line_no: usize) -> Option<DateTime<FixedOffset>> {
    let raw = text(comment, "reviewDate")?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!(line = line_no, value = %raw, error = %e, "Unparseable reviewDate, storing none");
            None
        }
    }
}

fn overall_entry(entry: &Value) -> Result<OverallEntry, LineError> {
    let entry = entry
        .as_object()
        .ok_or_else(|| invalid("overallByProviders entry is not an object"))?;

    let provider = RatingProvider::new(
        require_id(entry, "providerId")?,
        text(entry, "provider")
            .ok_or_else(|| invalid("overallByProviders entry has no provider name"))?,
    );

    let grades = match entry.get("grades") {
        Some(Value::Object(grades)) => grades
            .iter()
            .map(|(category, score)| {
                as_f64(score)
                    .map(|s| (category.clone(), s))
                    .ok_or_else(|| LineError::Invalid(format!("grade {category} is not a number")))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    Ok(OverallEntry {
        provider,
        overall_score: number(entry, "overallScore"),
        review_count: int(entry, "reviewCount"),
        grades,
    })
}
