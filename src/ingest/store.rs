//! Persistence boundary used by the importer.
//!
//! The importer only needs id lookup, single insert and bulk insert for each
//! entity kind. The Diesel store in `repository::store` is the production
//! implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    OverallByProvider, Property, RatingProvider, Review, ReviewGrade, Reviewer, ReviewerInfo,
    ReviewerKey,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same primary key or natural key already exists.
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Database(String),
}

/// Reference data: rating providers, properties and reviewers.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn find_provider(&self, id: i64) -> Result<Option<RatingProvider>, StoreError>;

    async fn save_provider(&self, provider: &RatingProvider) -> Result<(), StoreError>;

    async fn find_property(&self, id: i64) -> Result<Option<Property>, StoreError>;

    async fn save_property(&self, property: &Property) -> Result<(), StoreError>;

    async fn find_reviewer(&self, key: &ReviewerKey) -> Result<Option<Reviewer>, StoreError>;

    /// Insert a reviewer, returning it with its assigned id.
    async fn save_reviewer(&self, info: &ReviewerInfo) -> Result<Reviewer, StoreError>;
}

/// Reviews and their dependent rows.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn review_exists(&self, id: i64) -> Result<bool, StoreError>;

    /// Bulk insert in one transaction: reviews, then grades, then
    /// overall-by-provider rows. On error nothing is written.
    async fn save_all(
        &self,
        reviews: &[Review],
        grades: &[ReviewGrade],
        overalls: &[OverallByProvider],
    ) -> Result<(), StoreError>;

    async fn save_review(&self, review: &Review) -> Result<(), StoreError>;

    async fn save_grade(&self, grade: &ReviewGrade) -> Result<(), StoreError>;

    async fn save_overall(&self, overall: &OverallByProvider) -> Result<(), StoreError>;
}
