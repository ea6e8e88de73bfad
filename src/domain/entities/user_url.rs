//! Ownership link between a user and a URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ownership edge, soft-deletable independently per owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub id: String,
    pub user_id: String,
    pub url_id: String,
    #[serde(rename = "is_deleted", default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl UserUrl {
    /// Creates a live link from `user_id` to `url_id`.
    pub fn new(user_id: impl Into<String>, url_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            url_id: url_id.into(),
            deleted: false,
            created_at: Utc::now(),
        }
    }
}
