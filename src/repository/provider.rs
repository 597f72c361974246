//! Rating provider repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ProviderRecord;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::RatingProvider;
use crate::schema::rating_providers;

#[derive(Clone)]
pub struct ProviderRepository {
    pool: AsyncSqlitePool,
}

impl ProviderRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a provider by upstream id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<RatingProvider>, DieselError> {
        let mut conn = self.pool.get().await?;

        rating_providers::table
            .find(id)
            .first::<ProviderRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(RatingProvider::from))
    }

    /// Insert a provider. Fails with a unique violation if the id exists.
    pub async fn save(&self, provider: &RatingProvider) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(rating_providers::table)
            .values(ProviderRecord::from(provider))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::util::is_unique_violation;
    use super::super::DbContext;
    use super::*;

    #[tokio::test]
    async fn provider_crud() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.providers();

        assert!(repo.find_by_id(5).await.unwrap().is_none());
        repo.save(&RatingProvider::new(5, "Expedia")).await.unwrap();

        let fetched = repo.find_by_id(5).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Expedia");
        assert!(repo.find_by_id(6).await.unwrap().is_none());

        let err = repo
            .save(&RatingProvider::new(5, "Agoda"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(ctx.count_rows("rating_providers").await, 1);
    }
}
