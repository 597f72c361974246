//! Diesel-backed implementation of the importer's store traits.

use async_trait::async_trait;

use super::context::DbContext;
use super::pool::DieselError;
use super::util::is_unique_violation;
use crate::ingest::{ReferenceStore, ReviewStore, StoreError};
use crate::models::{
    OverallByProvider, Property, RatingProvider, Review, ReviewGrade, Reviewer, ReviewerInfo,
    ReviewerKey,
};

impl From<DieselError> for StoreError {
    fn from(e: DieselError) -> Self {
        if is_unique_violation(&e) {
            StoreError::Duplicate(e.to_string())
        } else {
            StoreError::Database(e.to_string())
        }
    }
}

/// Store writing to SQLite through the repositories of a [`DbContext`].
#[derive(Clone)]
pub struct DieselStore {
    ctx: DbContext,
}

impl DieselStore {
    pub fn new(ctx: DbContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ReferenceStore for DieselStore {
    async fn find_provider(&self, id: i64) -> Result<Option<RatingProvider>, StoreError> {
        Ok(self.ctx.providers().find_by_id(id).await?)
    }

    async fn save_provider(&self, provider: &RatingProvider) -> Result<(), StoreError> {
        Ok(self.ctx.providers().save(provider).await?)
    }

    async fn find_property(&self, id: i64) -> Result<Option<Property>, StoreError> {
        Ok(self.ctx.properties().find_by_id(id).await?)
    }

    async fn save_property(&self, property: &Property) -> Result<(), StoreError> {
        Ok(self.ctx.properties().save(property).await?)
    }

    async fn find_reviewer(&self, key: &ReviewerKey) -> Result<Option<Reviewer>, StoreError> {
        Ok(self.ctx.reviewers().find_by_natural_key(key).await?)
    }

    async fn save_reviewer(&self, info: &ReviewerInfo) -> Result<Reviewer, StoreError> {
        Ok(self.ctx.reviewers().save(info).await?)
    }
}

#[async_trait]
impl ReviewStore for DieselStore {
    async fn review_exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.ctx.reviews().exists(id).await?)
    }

    async fn save_all(
        &self,
        reviews: &[Review],
        grades: &[ReviewGrade],
        overalls: &[OverallByProvider],
    ) -> Result<(), StoreError> {
        Ok(self.ctx.reviews().save_all(reviews, grades, overalls).await?)
    }

    async fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        Ok(self.ctx.reviews().save(review).await?)
    }

    async fn save_grade(&self, grade: &ReviewGrade) -> Result<(), StoreError> {
        Ok(self.ctx.reviews().save_grade(grade).await?)
    }

    async fn save_overall(&self, overall: &OverallByProvider) -> Result<(), StoreError> {
        Ok(self.ctx.reviews().save_overall(overall).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_provider_maps_to_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let store = ctx.store();

        let provider = RatingProvider::new(5, "Expedia");
        store.save_provider(&provider).await.unwrap();
        let err = store.save_provider(&provider).await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.find_provider(5).await.unwrap(), Some(provider));
    }
}
