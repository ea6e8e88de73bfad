mod common;

use std::sync::Arc;
use url_shortener::infrastructure::persistence::MemoryStore;

#[tokio::test]
async fn test_user_roundtrip() {
    common::user_roundtrip(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_dedup_idempotence() {
    common::dedup_idempotence(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_reference_counted_tombstone() {
    common::reference_counted_tombstone(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_listing_excludes_own_deleted() {
    common::listing_excludes_own_deleted(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_batch_atomicity() {
    common::batch_atomicity(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_batch_creates_every_item() {
    common::batch_creates_every_item(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_delete_by_non_owner_is_noop() {
    common::delete_by_non_owner_is_noop(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_relinking_revives_tombstone() {
    common::relinking_revives_tombstone(&MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_same_original() {
    common::concurrent_create_same_original(Arc::new(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_delete_and_relink() {
    common::concurrent_delete_and_relink(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_ping() {
    common::ping(&MemoryStore::new()).await;
}
