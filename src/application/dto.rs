//! Input and output shapes of the application services.
//!
//! Field names follow the JSON the batch file and listing output use.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to shorten a single URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
}

/// One item of a batch shorten request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchItem {
    #[validate(length(max = 256))]
    pub correlation_id: String,

    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,
}

/// Response item pairing a request's `correlation_id` with its short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResultItem {
    pub correlation_id: String,
    pub short_url: String,
}

/// One live link owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUrlItem {
    pub short_url: String,
    pub original_url: String,
}

/// Result of shortening a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShortenOutcome {
    /// A new row was stored.
    Created { slug: String, short_url: String },
    /// The URL was already known; the caller now owns a link to the existing
    /// row.
    AlreadyExists { slug: String, short_url: String },
}

impl ShortenOutcome {
    pub fn short_url(&self) -> &str {
        match self {
            Self::Created { short_url, .. } | Self::AlreadyExists { short_url, .. } => short_url,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Self::Created { slug, .. } | Self::AlreadyExists { slug, .. } => slug,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}
