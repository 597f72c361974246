//! Repository utilities.

use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};

/// Simple error info wrapper for database errors.
#[derive(Debug)]
pub struct DbErrorInfo(pub String);

impl DatabaseErrorInformation for DbErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Convert any displayable error to a diesel error with proper message.
pub fn to_diesel_error(e: impl std::fmt::Display) -> diesel::result::Error {
    diesel::result::Error::DatabaseError(
        DatabaseErrorKind::Unknown,
        Box::new(DbErrorInfo(e.to_string())),
    )
}

/// True when the error is a primary-key or unique-index violation.
pub fn is_unique_violation(e: &diesel::result::Error) -> bool {
    matches!(
        e,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Parse a timestamp column, defaulting to the Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_timestamps_fall_back() {
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn offset_is_normalised_to_utc() {
        let dt = parse_datetime("2025-01-01T09:30:00+07:00");
        assert_eq!(dt.to_rfc3339(), "2025-01-01T02:30:00+00:00");
    }

    #[test]
    fn wrapped_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&to_diesel_error("boom")));
        assert!(!is_unique_violation(&diesel::result::Error::NotFound));
    }
}
