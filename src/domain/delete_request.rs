//! Deletion request model for asynchronous soft deletes.

/// A request from `user_id` to drop its link to `slug`.
///
/// Pushed onto the deletion queue by the caller, which reports "accepted"
/// without waiting; applied later by
/// [`crate::domain::delete_worker::run_delete_worker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub user_id: String,
    pub slug: String,
}

impl DeleteRequest {
    /// Creates a new deletion request.
    pub fn new(user_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            slug: slug.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_request_creation() {
        let req = DeleteRequest::new("user-1", "aBcDeFgH");

        assert_eq!(req.user_id, "user-1");
        assert_eq!(req.slug, "aBcDeFgH");
    }
}
