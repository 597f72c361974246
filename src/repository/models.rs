//! Diesel row types.
//!
//! Timestamps are stored as RFC 3339 text.

use diesel::prelude::*;

use super::util::parse_datetime;
use crate::models::{
    OverallByProvider, Property, RatingProvider, Review, ReviewGrade, Reviewer, ReviewerInfo,
};
use crate::schema;

/// Rating provider row.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::rating_providers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProviderRecord {
    pub id: i64,
    pub name: String,
}

impl From<ProviderRecord> for RatingProvider {
    fn from(record: ProviderRecord) -> Self {
        RatingProvider::new(record.id, record.name)
    }
}

impl From<&RatingProvider> for ProviderRecord {
    fn from(provider: &RatingProvider) -> Self {
        Self {
            id: provider.id,
            name: provider.name.clone(),
        }
    }
}

/// Property row.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::properties)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PropertyRecord {
    pub id: i64,
    pub name: Option<String>,
}

impl From<PropertyRecord> for Property {
    fn from(record: PropertyRecord) -> Self {
        Property::new(record.id, record.name)
    }
}

impl From<&Property> for PropertyRecord {
    fn from(property: &Property) -> Self {
        Self {
            id: property.id,
            name: property.name.clone(),
        }
    }
}

/// Reviewer row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::reviewers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewerRecord {
    pub id: i64,
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
    pub created_at: String,
}

impl From<ReviewerRecord> for Reviewer {
    fn from(record: ReviewerRecord) -> Self {
        Reviewer {
            id: record.id,
            info: ReviewerInfo {
                display_name: record.display_name,
                country_name: record.country_name,
                flag_name: record.flag_name,
                review_group_name: record.review_group_name,
                room_type_name: record.room_type_name,
                country_id: record.country_id,
                length_of_stay: record.length_of_stay,
                review_group_id: record.review_group_id,
                room_type_id: record.room_type_id,
                reviewed_count: record.reviewed_count,
                is_expert_reviewer: record.is_expert_reviewer,
                is_show_global_icon: record.is_show_global_icon,
                is_show_reviewed_count: record.is_show_reviewed_count,
            },
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// New reviewer for insertion; the id is assigned by SQLite.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::reviewers)]
pub struct NewReviewer<'a> {
    pub display_name: Option<&'a str>,
    pub country_name: Option<&'a str>,
    pub flag_name: Option<&'a str>,
    pub review_group_name: Option<&'a str>,
    pub room_type_name: Option<&'a str>,
    pub country_id: Option<i32>,
    pub length_of_stay: Option<i32>,
    pub review_group_id: Option<i32>,
    pub room_type_id: Option<i32>,
    pub reviewed_count: Option<i32>,
    pub is_expert_reviewer: Option<bool>,
    pub is_show_global_icon: Option<bool>,
    pub is_show_reviewed_count: Option<bool>,
    pub created_at: &'a str,
}

impl<'a> NewReviewer<'a> {
    pub fn new(info: &'a ReviewerInfo, created_at: &'a str) -> Self {
        Self {
            display_name: info.display_name.as_deref(),
            country_name: info.country_name.as_deref(),
            flag_name: info.flag_name.as_deref(),
            review_group_name: info.review_group_name.as_deref(),
            room_type_name: info.room_type_name.as_deref(),
            country_id: info.country_id,
            length_of_stay: info.length_of_stay,
            review_group_id: info.review_group_id,
            room_type_id: info.room_type_id,
            reviewed_count: info.reviewed_count,
            is_expert_reviewer: info.is_expert_reviewer,
            is_show_global_icon: info.is_show_global_icon,
            is_show_reviewed_count: info.is_show_reviewed_count,
            created_at,
        }
    }
}

/// Review row. The id is upstream-assigned, so the record is inserted as is.
///
/// NULLs are bound explicitly so a batch can go out as one multi-row insert.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::reviews)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewReview {
    pub id: i64,
    pub property_id: i64,
    pub provider_id: i64,
    pub reviewer_id: i64,
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
    pub review_date: Option<String>,
    pub original_title: Option<String>,
    pub original_comment: Option<String>,
    pub formatted_response_date: Option<String>,
    pub is_show_review_response: Option<bool>,
    pub created_at: String,
}

impl From<&Review> for NewReview {
    fn from(review: &Review) -> Self {
        let d = &review.details;
        Self {
            id: review.id,
            property_id: review.property_id,
            provider_id: review.provider_id,
            reviewer_id: review.reviewer_id,
            rating: d.rating,
            check_in_month_year: d.check_in_month_year.clone(),
            encrypted_review_data: d.encrypted_review_data.clone(),
            formatted_rating: d.formatted_rating.clone(),
            formatted_review_date: d.formatted_review_date.clone(),
            rating_text: d.rating_text.clone(),
            responder_name: d.responder_name.clone(),
            response_date_text: d.response_date_text.clone(),
            response_translate_source: d.response_translate_source.clone(),
            review_comments: d.review_comments.clone(),
            review_negatives: d.review_negatives.clone(),
            review_positives: d.review_positives.clone(),
            review_provider_logo: d.review_provider_logo.clone(),
            review_provider_text: d.review_provider_text.clone(),
            review_title: d.review_title.clone(),
            translate_source: d.translate_source.clone(),
            translate_target: d.translate_target.clone(),
            review_date: d.review_date.map(|dt| dt.to_rfc3339()),
            original_title: d.original_title.clone(),
            original_comment: d.original_comment.clone(),
            formatted_response_date: d.formatted_response_date.clone(),
            is_show_review_response: d.is_show_review_response,
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

/// New review grade for insertion.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::review_grades)]
pub struct NewReviewGrade {
    pub review_id: i64,
    pub category: String,
    pub score: f64,
}

impl From<&ReviewGrade> for NewReviewGrade {
    fn from(grade: &ReviewGrade) -> Self {
        Self {
            review_id: grade.review_id,
            category: grade.category.clone(),
            score: grade.score,
        }
    }
}

/// New overall-by-provider row for insertion.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::overall_by_providers)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewOverallByProvider {
    pub review_id: i64,
    pub provider_id: i64,
    pub overall_score: Option<f64>,
    pub review_count: Option<i32>,
    pub created_at: String,
}

impl From<&OverallByProvider> for NewOverallByProvider {
    fn from(obp: &OverallByProvider) -> Self {
        Self {
            review_id: obp.review_id,
            provider_id: obp.provider_id,
            overall_score: obp.overall_score,
            review_count: obp.review_count,
            created_at: obp.created_at.to_rfc3339(),
        }
    }
}
