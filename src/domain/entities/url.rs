//! URL entity representing a stored short link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shortened URL with its lookup slug.
///
/// `correlation_id` is an opaque tag supplied by batch callers to pair
/// request items with response items; it plays no part in lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    pub id: String,
    #[serde(default)]
    pub correlation_id: String,
    pub slug: String,
    #[serde(rename = "original_url")]
    pub original: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "is_deleted", default)]
    pub deleted: bool,
}

impl Url {
    /// Creates a live URL with a fresh id and the current timestamp.
    pub fn new(slug: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            correlation_id: String::new(),
            slug: slug.into(),
            original: original.into(),
            created_at: Utc::now(),
            deleted: false,
        }
    }

    /// Sets the batch correlation tag.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Returns true if every owner has deleted this URL.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}
