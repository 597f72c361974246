//! Review repository, including the dependent grade and
//! overall-by-provider rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{NewOverallByProvider, NewReview, NewReviewGrade};
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{OverallByProvider, Review, ReviewGrade};
use crate::schema::{overall_by_providers, review_grades, reviews};

/// Rows per INSERT statement. Keeps the widest table under SQLite's
/// bound-parameter limit.
const MAX_ROWS_PER_INSERT: usize = 500;

#[derive(Clone)]
pub struct ReviewRepository {
    pool: AsyncSqlitePool,
}

impl ReviewRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, id: i64) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = reviews::table
            .filter(reviews::id.eq(id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    pub async fn save(&self, review: &Review) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(reviews::table)
            .values(NewReview::from(review))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn save_grade(&self, grade: &ReviewGrade) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(review_grades::table)
            .values(NewReviewGrade::from(grade))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn save_overall(&self, overall: &OverallByProvider) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(overall_by_providers::table)
            .values(NewOverallByProvider::from(overall))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Insert reviews, then grades, then overall-by-provider rows, all in
    /// one transaction. Any failure rolls back the whole batch.
    ///
    /// Each table is written with multi-row inserts. diesel-async cannot
    /// express a SQLite batch insert, so this runs on the wrapped blocking
    /// connection.
    pub async fn save_all(
        &self,
        reviews: &[Review],
        grades: &[ReviewGrade],
        overalls: &[OverallByProvider],
    ) -> Result<(), DieselError> {
        let review_rows: Vec<NewReview> = reviews.iter().map(NewReview::from).collect();
        let grade_rows: Vec<NewReviewGrade> = grades.iter().map(NewReviewGrade::from).collect();
        let overall_rows: Vec<NewOverallByProvider> =
            overalls.iter().map(NewOverallByProvider::from).collect();
        let mut conn = self.pool.get().await?;

        conn.spawn_blocking(move |conn| {
            conn.transaction::<_, DieselError, _>(|conn| {
                for chunk in review_rows.chunks(MAX_ROWS_PER_INSERT) {
                    diesel::RunQueryDsl::execute(
                        diesel::insert_into(reviews::table).values(chunk),
                        conn,
                    )?;
                }
                for chunk in grade_rows.chunks(MAX_ROWS_PER_INSERT) {
                    diesel::RunQueryDsl::execute(
                        diesel::insert_into(review_grades::table).values(chunk),
                        conn,
                    )?;
                }
                for chunk in overall_rows.chunks(MAX_ROWS_PER_INSERT) {
                    diesel::RunQueryDsl::execute(
                        diesel::insert_into(overall_by_providers::table).values(chunk),
                        conn,
                    )?;
                }
                Ok(())
            })
        })
        .await
    }
}
