//! Background worker that applies queued soft deletes in timed batches.
//!
//! Requests accumulate in memory and are flushed once per tick. Delivery is
//! at-most-once: a batch held in memory is lost if the process dies before
//! the next tick. Closing the queue (dropping every sender) triggers a last
//! flush before the worker exits.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::domain::delete_request::DeleteRequest;
use crate::domain::repositories::Store;

/// Default number of requests the queue holds before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default time between two flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Creates the bounded deletion queue.
///
/// `send().await` on a full queue waits for room; there is no drop policy.
pub fn delete_queue(
    capacity: usize,
) -> (mpsc::Sender<DeleteRequest>, mpsc::Receiver<DeleteRequest>) {
    mpsc::channel(capacity)
}

/// Drains `rx` and soft-deletes the accumulated batch every `flush_interval`.
///
/// Runs until every sender is dropped. Per-request failures are logged and
/// dropped; they never block the rest of the batch and are not retried.
pub async fn run_delete_worker<S>(
    mut rx: mpsc::Receiver<DeleteRequest>,
    store: Arc<S>,
    flush_interval: Duration,
) where
    S: Store + ?Sized,
{
    let mut ticker = time::interval_at(Instant::now() + flush_interval, flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut batch: Vec<DeleteRequest> = Vec::new();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(request) => batch.push(request),
                None => {
                    flush(store.as_ref(), &mut batch).await;
                    info!("Delete queue closed, worker stopped");
                    return;
                }
            },
            _ = ticker.tick() => flush(store.as_ref(), &mut batch).await,
        }
    }
}

async fn flush<S>(store: &S, batch: &mut Vec<DeleteRequest>)
where
    S: Store + ?Sized,
{
    if batch.is_empty() {
        return;
    }

    counter!("delete_flushes_total").increment(1);

    let mut applied = 0usize;
    let mut failed = 0usize;

    for request in batch.drain(..) {
        match store.soft_delete_url(&request.user_id, &request.slug).await {
            Ok(()) => {
                applied += 1;
                counter!("delete_requests_applied_total").increment(1);
                info!(user_id = %request.user_id, slug = %request.slug, "Deleted url");
            }
            Err(e) => {
                failed += 1;
                counter!("delete_requests_failed_total").increment(1);
                error!(
                    user_id = %request.user_id,
                    slug = %request.slug,
                    error = %e,
                    "Failed to delete url"
                );
            }
        }
    }

    debug!(applied, failed, "Delete batch flushed");
}
