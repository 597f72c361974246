//! Reviewer repository.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{NewReviewer, ReviewerRecord};
use super::pool::{AsyncSqlitePool, DieselError};
use super::util::parse_datetime;
use crate::models::{Reviewer, ReviewerInfo, ReviewerKey};
use crate::schema::reviewers;

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt, column_name = "last_insert_rowid()")]
    id: i64,
}

#[derive(Clone)]
pub struct ReviewerRepository {
    pool: AsyncSqlitePool,
}

impl ReviewerRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Indexed lookup on (display_name, country_name).
    pub async fn find_by_natural_key(
        &self,
        key: &ReviewerKey,
    ) -> Result<Option<Reviewer>, DieselError> {
        let mut conn = self.pool.get().await?;

        reviewers::table
            .filter(reviewers::display_name.eq(&key.display_name))
            .filter(reviewers::country_name.eq(&key.country_name))
            .first::<ReviewerRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Reviewer::from))
    }

    /// Insert a reviewer and return it with its assigned id.
    ///
    /// A reviewer whose natural key already exists fails with a unique
    /// violation.
    pub async fn save(&self, info: &ReviewerInfo) -> Result<Reviewer, DieselError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;

        diesel::insert_into(reviewers::table)
            .values(NewReviewer::new(info, &now))
            .execute(&mut conn)
            .await?;
        let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
            .get_result(&mut conn)
            .await?;

        Ok(Reviewer {
            id: row.id,
            info: info.clone(),
            created_at: parse_datetime(&now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::util::is_unique_violation;
    use super::super::DbContext;
    use super::*;

    fn info(name: Option<&str>, country: Option<&str>) -> ReviewerInfo {
        ReviewerInfo {
            display_name: name.map(String::from),
            country_name: country.map(String::from),
            length_of_stay: Some(3),
            is_expert_reviewer: Some(false),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn natural_key_lookup_and_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.reviewers();

        let jane = repo.save(&info(Some("Jane"), Some("US"))).await.unwrap();
        let key = jane.info.natural_key().unwrap();

        let found = repo.find_by_natural_key(&key).await.unwrap().unwrap();
        assert_eq!(found.id, jane.id);
        assert_eq!(found.info.length_of_stay, Some(3));

        let err = repo.save(&info(Some("Jane"), Some("US"))).await.unwrap_err();
        assert!(is_unique_violation(&err));

        repo.save(&info(Some("Jane"), Some("UK"))).await.unwrap();
        assert_eq!(ctx.count_rows("reviewers").await, 2);
    }

    #[tokio::test]
    async fn partial_keys_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.reviewers();

        let a = repo.save(&info(Some("Anonymous"), None)).await.unwrap();
        let b = repo.save(&info(Some("Anonymous"), None)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(ctx.count_rows("reviewers").await, 2);
    }
}
