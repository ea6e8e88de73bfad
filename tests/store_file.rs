mod common;

use std::sync::Arc;
use tempfile::TempDir;
use url_shortener::domain::entities::User;
use url_shortener::domain::repositories::{Store, StoreError};
use url_shortener::infrastructure::persistence::FileStore;

async fn open(dir: &TempDir) -> FileStore {
    FileStore::open(dir.path().join("storage.json"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_user_roundtrip() {
    let dir = TempDir::new().unwrap();
    common::user_roundtrip(&open(&dir).await).await;
}

#[tokio::test]
async fn test_dedup_idempotence() {
    let dir = TempDir::new().unwrap();
    common::dedup_idempotence(&open(&dir).await).await;
}

#[tokio::test]
async fn test_reference_counted_tombstone() {
    let dir = TempDir::new().unwrap();
    common::reference_counted_tombstone(&open(&dir).await).await;
}

#[tokio::test]
async fn test_listing_excludes_own_deleted() {
    let dir = TempDir::new().unwrap();
    common::listing_excludes_own_deleted(&open(&dir).await).await;
}

#[tokio::test]
async fn test_batch_atomicity() {
    let dir = TempDir::new().unwrap();
    common::batch_atomicity(&open(&dir).await).await;
}

#[tokio::test]
async fn test_batch_creates_every_item() {
    let dir = TempDir::new().unwrap();
    common::batch_creates_every_item(&open(&dir).await).await;
}

#[tokio::test]
async fn test_delete_by_non_owner_is_noop() {
    let dir = TempDir::new().unwrap();
    common::delete_by_non_owner_is_noop(&open(&dir).await).await;
}

#[tokio::test]
async fn test_relinking_revives_tombstone() {
    let dir = TempDir::new().unwrap();
    common::relinking_revives_tombstone(&open(&dir).await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_same_original() {
    let dir = TempDir::new().unwrap();
    common::concurrent_create_same_original(Arc::new(open(&dir).await)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_delete_and_relink() {
    let dir = TempDir::new().unwrap();
    common::concurrent_delete_and_relink(Arc::new(open(&dir).await)).await;
}

#[tokio::test]
async fn test_empty_file_is_empty_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "  \n").unwrap();

    let store = FileStore::open(&path).await.unwrap();

    assert!(store.list_urls_by_user_id("anyone").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_fails_fast() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "{\"urls\": [").unwrap();

    let result = FileStore::open(&path).await;

    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[tokio::test]
async fn test_reopen_restores_links_and_tombstones() {
    let dir = TempDir::new().unwrap();
    let (owner, live, dead) = {
        let store = open(&dir).await;
        let owner = common::registered_user(&store).await;
        let live = store
            .create_url(&owner.id, common::random_url(&common::random_original()))
            .await
            .unwrap();
        let dead = store
            .create_url(&owner.id, common::random_url(&common::random_original()))
            .await
            .unwrap();
        store.soft_delete_url(&owner.id, &dead.slug).await.unwrap();
        (owner, live, dead)
    };

    let store = open(&dir).await;

    assert_eq!(store.get_user(&owner.id).await.unwrap().id, owner.id);
    let listed = store.list_urls_by_user_id(&owner.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].slug, live.slug);
    assert!(store.get_url(&dead.slug).await.unwrap().deleted);
}

#[tokio::test]
async fn test_snapshot_layout() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let user = User::new();
    store.create_user(user.clone()).await.unwrap();
    let url = store
        .create_url(&user.id, common::random_url("https://example.com/layout"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(
        json["urls"][&url.slug]["original_url"],
        "https://example.com/layout"
    );
    assert_eq!(json["users"][&user.id]["id"], user.id.as_str());
    assert_eq!(json["user_urls"][&user.id][0]["slug"], url.slug.as_str());
    assert_eq!(json["user_urls"][&user.id][0]["is_deleted"], false);
}

#[tokio::test]
async fn test_legacy_snapshot_is_readable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(
        &path,
        r#"{
            "urls": {
                "aBcDeFgH": {
                    "id": "7f3c1f5e-0000-4000-8000-000000000001",
                    "correlation_id": "",
                    "slug": "aBcDeFgH",
                    "original_url": "https://example.com/legacy",
                    "created_at": "2024-03-01T12:00:00Z",
                    "is_deleted": false
                }
            },
            "users": {
                "user-1": { "id": "user-1", "created_at": "2024-03-01T11:59:00Z" }
            },
            "user_urls": { "user-1": ["aBcDeFgH"] }
        }"#,
    )
    .unwrap();

    let store = FileStore::open(&path).await.unwrap();

    let listed = store.list_urls_by_user_id("user-1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].original, "https://example.com/legacy");

    store.soft_delete_url("user-1", "aBcDeFgH").await.unwrap();
    assert!(store.get_url("aBcDeFgH").await.unwrap().deleted);
}
