//! Short link creation, lookup and deletion service.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::application::dto::{
    BatchItem, BatchResultItem, ShortenOutcome, ShortenRequest, UserUrlItem,
};
use crate::domain::delete_request::DeleteRequest;
use crate::domain::entities::Url;
use crate::domain::repositories::{Store, StoreError};
use crate::error::AppError;
use crate::utils::db_error::SLUG_CONSTRAINT;
use crate::utils::slug::{generate_slug, is_valid_slug};

/// Attempts before giving up on slug collisions.
const MAX_SLUG_ATTEMPTS: usize = 10;

/// Largest accepted batch.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Request-handling boundary over a [`Store`].
///
/// Creation and lookup call the store inline. Deletions are pushed onto the
/// deletion queue and applied later by the delete worker.
pub struct LinkService<S: Store + ?Sized> {
    store: Arc<S>,
    base_url: String,
    delete_tx: mpsc::Sender<DeleteRequest>,
}

impl<S: Store + ?Sized> LinkService<S> {
    /// Creates a new link service.
    ///
    /// # Arguments
    ///
    /// - `store` - backend every operation goes through
    /// - `base_url` - prefix of generated short links, trailing `/` ignored
    /// - `delete_tx` - producer side of the deletion queue
    pub fn new(
        store: Arc<S>,
        base_url: impl Into<String>,
        delete_tx: mpsc::Sender<DeleteRequest>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            store,
            base_url,
            delete_tx,
        }
    }

    /// Builds the public short link for `slug`.
    pub fn short_url(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url, slug)
    }

    /// Shortens `original` on behalf of `user_id`.
    ///
    /// # Deduplication
    ///
    /// If the URL is already stored, `user_id` is linked to the existing row
    /// and [`ShortenOutcome::AlreadyExists`] carries its canonical short link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `original` is not an absolute
    /// HTTP(S) URL.
    ///
    /// Returns [`AppError::Internal`] on storage failure or if no free slug is
    /// found after several attempts.
    pub async fn shorten(&self, user_id: &str, original: &str) -> Result<ShortenOutcome, AppError> {
        let request = ShortenRequest {
            url: original.trim().to_string(),
        };
        validate_original(&request)?;

        for _ in 0..MAX_SLUG_ATTEMPTS {
            let url = Url::new(generate_slug(), request.url.as_str());

            match self.store.create_url(user_id, url).await {
                Ok(url) => {
                    info!(user_id, slug = %url.slug, "Short link created");
                    return Ok(ShortenOutcome::Created {
                        short_url: self.short_url(&url.slug),
                        slug: url.slug,
                    });
                }
                Err(StoreError::AlreadyExists { existing }) => {
                    debug!(user_id, slug = %existing.slug, "Url already shortened");
                    return Ok(ShortenOutcome::AlreadyExists {
                        short_url: self.short_url(&existing.slug),
                        slug: existing.slug,
                    });
                }
                Err(StoreError::IntegrityViolation { constraint })
                    if constraint == SLUG_CONSTRAINT =>
                {
                    warn!(user_id, "Slug collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal(
            "Failed to generate unique slug",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    /// Shortens every item as one all-or-nothing unit.
    ///
    /// Batch creation does not dedup against stored URLs; each item gets a
    /// fresh row. Results keep request order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty or oversized batch or if
    /// any item is invalid; nothing is stored in that case.
    pub async fn shorten_batch(
        &self,
        user_id: &str,
        items: Vec<BatchItem>,
    ) -> Result<Vec<BatchResultItem>, AppError> {
        if items.is_empty() {
            return Err(AppError::bad_request("Batch is empty", json!({})));
        }

        if items.len() > MAX_BATCH_SIZE {
            return Err(AppError::bad_request(
                "Batch is too large",
                json!({ "max": MAX_BATCH_SIZE, "got": items.len() }),
            ));
        }

        for (index, item) in items.iter().enumerate() {
            item.validate().map_err(|e| {
                AppError::bad_request(
                    "Invalid batch item",
                    json!({ "index": index, "correlation_id": item.correlation_id, "reason": e.to_string() }),
                )
            })?;
            ensure_http(&item.original_url).map_err(|reason| {
                AppError::bad_request(
                    "Invalid batch item",
                    json!({ "index": index, "correlation_id": item.correlation_id, "reason": reason }),
                )
            })?;
        }

        for _ in 0..MAX_SLUG_ATTEMPTS {
            let urls: Vec<Url> = items
                .iter()
                .map(|item| {
                    Url::new(generate_slug(), item.original_url.trim())
                        .with_correlation_id(item.correlation_id.as_str())
                })
                .collect();

            match self.store.batch_create_url(user_id, urls.clone()).await {
                Ok(()) => {
                    info!(user_id, count = urls.len(), "Batch shortened");
                    return Ok(urls
                        .into_iter()
                        .map(|url| BatchResultItem {
                            short_url: self.short_url(&url.slug),
                            correlation_id: url.correlation_id,
                        })
                        .collect());
                }
                Err(StoreError::IntegrityViolation { constraint })
                    if constraint == SLUG_CONSTRAINT =>
                {
                    warn!(user_id, "Slug collision in batch, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal(
            "Failed to generate unique slugs",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    /// Resolves `slug` to its original URL.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the slug was never issued
    /// - [`AppError::Gone`] if every owner has deleted it
    pub async fn resolve(&self, slug: &str) -> Result<String, AppError> {
        if !is_valid_slug(slug) {
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "slug": slug }),
            ));
        }

        let url = self.store.get_url(slug).await?;

        if url.is_deleted() {
            return Err(AppError::gone(
                "Short link has been deleted",
                json!({ "slug": slug }),
            ));
        }

        Ok(url.original)
    }

    /// Lists the live links owned by `user_id`.
    pub async fn list_user_urls(&self, user_id: &str) -> Result<Vec<UserUrlItem>, AppError> {
        let urls = self.store.list_urls_by_user_id(user_id).await?;

        Ok(urls
            .into_iter()
            .map(|url| UserUrlItem {
                short_url: self.short_url(&url.slug),
                original_url: url.original,
            })
            .collect())
    }

    /// Queues deletion of `slugs` for `user_id` and returns how many were
    /// accepted.
    ///
    /// Waits for room when the queue is full. Deletions take effect after the
    /// worker's next flush.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty list and
    /// [`AppError::Internal`] if the queue has been closed.
    pub async fn request_deletion(
        &self,
        user_id: &str,
        slugs: Vec<String>,
    ) -> Result<usize, AppError> {
        if slugs.is_empty() {
            return Err(AppError::bad_request("No slugs to delete", json!({})));
        }

        let count = slugs.len();
        for slug in slugs {
            self.delete_tx
                .send(DeleteRequest::new(user_id, slug))
                .await
                .map_err(|_| AppError::internal("Deletion queue is closed", json!({})))?;
        }

        info!(user_id, count, "Deletion requests queued");
        Ok(count)
    }

    /// Storage liveness check.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await.map_err(AppError::from)
    }
}

fn validate_original(request: &ShortenRequest) -> Result<(), AppError> {
    if request.url.is_empty() {
        return Err(AppError::bad_request("URL is empty", json!({})));
    }

    request.validate().map_err(|e| {
        AppError::bad_request(
            "Invalid URL format",
            json!({ "url": request.url, "reason": e.to_string() }),
        )
    })?;

    ensure_http(&request.url).map_err(|reason| {
        AppError::bad_request(
            "Invalid URL format",
            json!({ "url": request.url, "reason": reason }),
        )
    })
}

/// Only absolute `http`/`https` URLs with a host are shortened.
fn ensure_http(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| e.to_string())?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        "http" | "https" => Err("missing host".to_string()),
        other => Err(format!("unsupported scheme: {other}")),
    }
}
