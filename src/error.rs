use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::repositories::StoreError;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorInfo<'a>,
}

#[derive(Serialize)]
struct ErrorInfo<'a> {
    code: &'static str,
    message: &'a str,
    details: &'a Value,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    Gone { message: String, details: Value },
    #[error("{message}")]
    Unauthorized { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }
    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::Gone { .. } => "gone",
            AppError::Unauthorized { .. } => "unauthorized",
            AppError::Internal { .. } => "internal_error",
        }
    }

    pub fn details(&self) -> &Value {
        match self {
            AppError::Validation { details, .. }
            | AppError::NotFound { details, .. }
            | AppError::Gone { details, .. }
            | AppError::Unauthorized { details, .. }
            | AppError::Internal { details, .. } => details,
        }
    }

    /// Renders `{"error": {"code", "message", "details"}}`.
    pub fn to_json(&self) -> Value {
        let message = self.to_string();
        let body = ErrorBody {
            error: ErrorInfo {
                code: self.code(),
                message: &message,
                details: self.details(),
            },
        };

        serde_json::to_value(body).unwrap_or(Value::Null)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UserNotFound(id) => {
                AppError::not_found("User not found", json!({ "user_id": id }))
            }
            StoreError::UrlNotFound(slug) => {
                AppError::not_found("Short link not found", json!({ "slug": slug }))
            }
            other => {
                tracing::error!(error = %other, "Store failure");
                AppError::internal("Storage error", json!({}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let err: AppError = StoreError::UrlNotFound("abc".into()).into();

        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(err.details()["slug"], "abc");
    }

    #[test]
    fn test_storage_failure_hides_details() {
        let err: AppError = StoreError::Io(std::io::Error::other("disk on fire")).into();

        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.details(), &json!({}));
        assert!(!err.to_string().contains("disk"));
    }

    #[test]
    fn test_json_body_shape() {
        let err = AppError::gone("Short link deleted", json!({ "slug": "abc" }));
        let body = err.to_json();

        assert_eq!(body["error"]["code"], "gone");
        assert_eq!(body["error"]["message"], "Short link deleted");
        assert_eq!(body["error"]["details"]["slug"], "abc");
    }
}
