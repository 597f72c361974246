//! Database context: owns the connection factory and hands out repositories.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::pool::{AsyncSqlitePool, DieselError};
use super::property::PropertyRepository;
use super::provider::ProviderRepository;
use super::review::ReviewRepository;
use super::reviewer::ReviewerRepository;
use super::store::DieselStore;

/// Idempotent DDL for every table the importer writes.
///
/// `reviewers` has no upstream id; the unique index on the natural key lets
/// concurrent workers detect a lost race. Rows with a NULL half never
/// compare equal, so they are always inserted as new reviewers.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS rating_providers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY,
    name TEXT
);

CREATE TABLE IF NOT EXISTS reviewers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT,
    country_name TEXT,
    flag_name TEXT,
    review_group_name TEXT,
    room_type_name TEXT,
    country_id INTEGER,
    length_of_stay INTEGER,
    review_group_id INTEGER,
    room_type_id INTEGER,
    reviewed_count INTEGER,
    is_expert_reviewer BOOLEAN,
    is_show_global_icon BOOLEAN,
    is_show_reviewed_count BOOLEAN,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_reviewers_natural_key
    ON reviewers(display_name, country_name);

CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY,
    property_id INTEGER NOT NULL REFERENCES properties(id),
    provider_id INTEGER NOT NULL REFERENCES rating_providers(id),
    reviewer_id INTEGER NOT NULL REFERENCES reviewers(id),
    rating REAL,
    check_in_month_year TEXT,
    encrypted_review_data TEXT,
    formatted_rating TEXT,
    formatted_review_date TEXT,
    rating_text TEXT,
    responder_name TEXT,
    response_date_text TEXT,
    response_translate_source TEXT,
    review_comments TEXT,
    review_negatives TEXT,
    review_positives TEXT,
    review_provider_logo TEXT,
    review_provider_text TEXT,
    review_title TEXT,
    translate_source TEXT,
    translate_target TEXT,
    review_date TEXT,
    original_title TEXT,
    original_comment TEXT,
    formatted_response_date TEXT,
    is_show_review_response BOOLEAN,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_property ON reviews(property_id);

CREATE TABLE IF NOT EXISTS review_grades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    review_id INTEGER NOT NULL REFERENCES reviews(id),
    category TEXT NOT NULL,
    score REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_review_grades_review ON review_grades(review_id);

CREATE TABLE IF NOT EXISTS overall_by_providers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    review_id INTEGER NOT NULL REFERENCES reviews(id),
    provider_id INTEGER NOT NULL REFERENCES rating_providers(id),
    overall_score REAL,
    review_count INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_obp_review ON overall_by_providers(review_id);
"#;

/// Database context that manages the connection factory and provides
/// repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("sqlite:reviews.db");
/// ctx.init_schema().await?;
/// let seen = ctx.reviews().exists(100).await?;
/// ```
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    /// Create a context from a database URL (`sqlite:path` or a bare path).
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
        }
    }

    /// Create a context from a file path.
    pub fn from_sqlite_path(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    pub fn providers(&self) -> ProviderRepository {
        ProviderRepository::new(self.pool.clone())
    }

    pub fn properties(&self) -> PropertyRepository {
        PropertyRepository::new(self.pool.clone())
    }

    pub fn reviewers(&self) -> ReviewerRepository {
        ReviewerRepository::new(self.pool.clone())
    }

    pub fn reviews(&self) -> ReviewRepository {
        ReviewRepository::new(self.pool.clone())
    }

    /// The store the importer writes through.
    pub fn store(&self) -> DieselStore {
        DieselStore::new(self.clone())
    }

    /// Create tables if they don't exist and switch the file to WAL.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute("PRAGMA journal_mode = WAL;").await?;
        conn.batch_execute(SCHEMA_SQL).await
    }
}

#[cfg(test)]
#[derive(diesel::QueryableByName)]
struct RowCount {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    n: i64,
}

#[cfg(test)]
impl DbContext {
    pub(crate) async fn conn(&self) -> super::pool::SqliteConn {
        self.pool.get().await.unwrap()
    }

    pub(crate) async fn count_rows(&self, table: &str) -> i64 {
        self.count_sql(format!("SELECT COUNT(*) AS n FROM {table}")).await
    }

    pub(crate) async fn count_where(&self, table: &str, column: &str, value: i64) -> i64 {
        self.count_sql(format!(
            "SELECT COUNT(*) AS n FROM {table} WHERE {column} = {value}"
        ))
        .await
    }

    async fn count_sql(&self, sql: String) -> i64 {
        use diesel_async::RunQueryDsl;

        let mut conn = self.conn().await;
        let row: RowCount = diesel::sql_query(sql)
            .get_result(&mut conn)
            .await
            .unwrap();
        row.n
    }
}
