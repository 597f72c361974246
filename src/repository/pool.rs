//! SQLite connection factory.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! for SQLite. SQLite connections are cheap to open, so a new one is created
//! per unit of work instead of pooling.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DieselError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// SQLite connection factory.
#[derive(Clone, Debug)]
pub struct AsyncSqlitePool {
    database_url: String,
}

impl AsyncSqlitePool {
    /// Create a new pool. A leading `sqlite:` is stripped.
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(db_path: &Path) -> Self {
        Self::new(&db_path.display().to_string())
    }

    /// Open a connection with foreign keys enforced and a busy timeout set.
    pub async fn get(&self) -> Result<SqliteConn, DieselError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        ))
        .await?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sqlite_prefix() {
        let pool = AsyncSqlitePool::new("sqlite:/tmp/reviews.db");
        assert_eq!(pool.database_url, "/tmp/reviews.db");

        let pool = AsyncSqlitePool::new("/tmp/reviews.db");
        assert_eq!(pool.database_url, "/tmp/reviews.db");
    }

    #[tokio::test]
    async fn connection_enforces_foreign_keys() {
        use diesel::sql_types::Integer;
        use diesel_async::RunQueryDsl;

        #[derive(diesel::QueryableByName)]
        struct Pragma {
            #[diesel(sql_type = Integer)]
            foreign_keys: i32,
        }

        let dir = tempfile::tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("fk.db"));
        let mut conn = pool.get().await.unwrap();

        let row: Pragma = diesel::sql_query("PRAGMA foreign_keys")
            .get_result(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.foreign_keys, 1);
    }
}
