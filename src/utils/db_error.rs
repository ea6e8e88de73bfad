//! Classification of PostgreSQL constraint violations.

use crate::domain::repositories::StoreError;

/// Unique constraint on `urls.slug`.
pub const SLUG_CONSTRAINT: &str = "urls_slug_key";

/// Unique constraint on `urls.original_url`; hitting it means another caller
/// stored the same original first.
pub const ORIGINAL_URL_CONSTRAINT: &str = "urls_original_url_key";

/// Returns true if `e` is a unique violation on the named constraint.
pub fn is_unique_violation_on(e: &sqlx::Error, constraint: &str) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    db_err.constraint() == Some(constraint)
}

/// Maps a SQL error onto the store taxonomy.
///
/// Unique violations become [`StoreError::IntegrityViolation`]; everything
/// else is passed through as [`StoreError::Database`].
pub fn classify(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error()
        && db_err.is_unique_violation()
    {
        return StoreError::IntegrityViolation {
            constraint: db_err.constraint().unwrap_or("unknown").to_string(),
        };
    }

    StoreError::Database(e)
}
