//! Store trait and its error taxonomy.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Url, User};

/// Errors crossing the store boundary.
///
/// Only the dedup race is recovered inside a store (into
/// [`StoreError::AlreadyExists`]); everything else is propagated as-is.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user with id {0} not found")]
    UserNotFound(String),

    #[error("url with slug {0} not found")]
    UrlNotFound(String),

    /// A URL with the same original already exists. The caller's user has
    /// been linked to `existing`, whose slug is the canonical short link.
    #[error("url {} already exists", existing.original)]
    AlreadyExists { existing: Url },

    #[error("integrity violation on {constraint}")]
    IntegrityViolation { constraint: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for the NotFound class (unknown user or slug).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::UrlNotFound(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage contract shared by the in-memory, file and PostgreSQL backends.
///
/// Every mutation on a given URL or link is serialized by the backend's own
/// locking discipline. Callers own the mapping of a tombstoned URL
/// (`deleted == true`) to a "gone" outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Registers a user. Upsert-by-id: a duplicate id keeps the existing
    /// record and is not an error.
    async fn create_user(&self, user: User) -> StoreResult<()>;

    /// Fetches a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UserNotFound`] if the id is unknown.
    async fn get_user(&self, user_id: &str) -> StoreResult<User>;

    /// Stores a URL and links it to `user_id`.
    ///
    /// If a row with the same `original` already exists, no new row is
    /// inserted; `user_id` is linked to the existing row instead.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] carrying the existing row when
    /// the original URL was already known. Any other failure is a storage
    /// error and leaves no partial state behind.
    async fn create_url(&self, user_id: &str, url: Url) -> StoreResult<Url>;

    /// Stores every URL and links each one to `user_id`, all or nothing.
    ///
    /// Unlike [`Store::create_url`] there is no dedup against existing rows:
    /// each item is inserted unconditionally.
    ///
    /// # Errors
    ///
    /// Stops at the first failing item; nothing from the call is persisted.
    async fn batch_create_url(&self, user_id: &str, urls: Vec<Url>) -> StoreResult<()>;

    /// Fetches a URL by slug, tombstoned or not.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UrlNotFound`] if the slug is unknown.
    async fn get_url(&self, slug: &str) -> StoreResult<Url>;

    /// Lists URLs reachable through a live link owned by `user_id`.
    ///
    /// Order is unspecified.
    async fn list_urls_by_user_id(&self, user_id: &str) -> StoreResult<Vec<Url>>;

    /// Marks the link from `user_id` to the URL behind `slug` deleted, then
    /// tombstones the URL if no live link remains. Both steps happen
    /// atomically. Deleting a slug the user does not own is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UrlNotFound`] if the slug is unknown.
    async fn soft_delete_url(&self, user_id: &str, slug: &str) -> StoreResult<()>;

    /// Liveness check.
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_class() {
        assert!(StoreError::UserNotFound("u".into()).is_not_found());
        assert!(StoreError::UrlNotFound("s".into()).is_not_found());
        assert!(
            !StoreError::IntegrityViolation {
                constraint: "urls_slug_key".into()
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_already_exists_message_names_original() {
        let err = StoreError::AlreadyExists {
            existing: Url::new("abcdefgh", "http://example.org"),
        };

        assert_eq!(err.to_string(), "url http://example.org already exists");
    }
}
