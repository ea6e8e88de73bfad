//! Behaviour every [`Store`] backend must share.
//!
//! Each scenario takes a freshly opened, empty store.

#![allow(dead_code)]

use std::sync::Arc;

use url_shortener::domain::entities::{Url, User};
use url_shortener::domain::repositories::{Store, StoreError};
use url_shortener::utils::slug::generate_slug;

pub fn random_url(original: &str) -> Url {
    Url::new(generate_slug(), original)
}

pub fn random_original() -> String {
    format!("https://example.com/{}", generate_slug())
}

pub async fn registered_user(store: &dyn Store) -> User {
    let user = User::new();
    store.create_user(user.clone()).await.unwrap();
    user
}

fn expect_already_exists(result: Result<Url, StoreError>) -> Url {
    match result {
        Err(StoreError::AlreadyExists { existing }) => existing,
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

pub async fn user_roundtrip(store: &dyn Store) {
    let user = registered_user(store).await;

    let loaded = store.get_user(&user.id).await.unwrap();
    assert_eq!(loaded.id, user.id);

    store.create_user(user.clone()).await.unwrap();

    assert!(matches!(
        store.get_user("no-such-user").await,
        Err(StoreError::UserNotFound(_))
    ));
}

pub async fn dedup_idempotence(store: &dyn Store) {
    let u1 = registered_user(store).await;
    let u2 = registered_user(store).await;
    let original = random_original();

    let first = store
        .create_url(&u1.id, random_url(&original))
        .await
        .unwrap();
    let existing = expect_already_exists(store.create_url(&u2.id, random_url(&original)).await);

    assert_eq!(existing.slug, first.slug);
    assert_eq!(existing.id, first.id);
    assert_eq!(store.list_urls_by_user_id(&u2.id).await.unwrap().len(), 1);

    // Same owner again: still one live link.
    expect_already_exists(store.create_url(&u1.id, random_url(&original)).await);
    assert_eq!(store.list_urls_by_user_id(&u1.id).await.unwrap().len(), 1);
}

pub async fn reference_counted_tombstone(store: &dyn Store) {
    let a = registered_user(store).await;
    let b = registered_user(store).await;
    let original = random_original();

    let url = store.create_url(&a.id, random_url(&original)).await.unwrap();
    expect_already_exists(store.create_url(&b.id, random_url(&original)).await);

    store.soft_delete_url(&a.id, &url.slug).await.unwrap();
    let after_a = store.get_url(&url.slug).await.unwrap();
    assert!(!after_a.deleted);
    assert_eq!(after_a.original, original);

    store.soft_delete_url(&b.id, &url.slug).await.unwrap();
    assert!(store.get_url(&url.slug).await.unwrap().deleted);
}

pub async fn listing_excludes_own_deleted(store: &dyn Store) {
    let a = registered_user(store).await;
    let b = registered_user(store).await;
    let original = random_original();

    let shared = store.create_url(&a.id, random_url(&original)).await.unwrap();
    expect_already_exists(store.create_url(&b.id, random_url(&original)).await);
    let own = store
        .create_url(&a.id, random_url(&random_original()))
        .await
        .unwrap();

    store.soft_delete_url(&a.id, &shared.slug).await.unwrap();

    let listed: Vec<String> = store
        .list_urls_by_user_id(&a.id)
        .await
        .unwrap()
        .into_iter()
        .map(|url| url.slug)
        .collect();
    assert_eq!(listed, vec![own.slug]);

    let listed_b = store.list_urls_by_user_id(&b.id).await.unwrap();
    assert_eq!(listed_b.len(), 1);
    assert_eq!(listed_b[0].slug, shared.slug);
}

pub async fn batch_atomicity(store: &dyn Store) {
    let owner = registered_user(store).await;
    let taken = store
        .create_url(&owner.id, random_url(&random_original()))
        .await
        .unwrap();

    let batch = vec![
        random_url(&random_original()),
        random_url(&random_original()),
        Url::new(taken.slug.clone(), random_original()),
    ];
    let first_slug = batch[0].slug.clone();

    let result = store.batch_create_url(&owner.id, batch).await;

    assert!(result.is_err());
    assert!(matches!(
        store.get_url(&first_slug).await,
        Err(StoreError::UrlNotFound(_))
    ));
    assert_eq!(store.list_urls_by_user_id(&owner.id).await.unwrap().len(), 1);
}

pub async fn batch_creates_every_item(store: &dyn Store) {
    let owner = registered_user(store).await;
    let batch: Vec<Url> = (0..3)
        .map(|i| random_url(&random_original()).with_correlation_id(i.to_string()))
        .collect();

    store.batch_create_url(&owner.id, batch.clone()).await.unwrap();

    for url in &batch {
        let stored = store.get_url(&url.slug).await.unwrap();
        assert_eq!(stored.correlation_id, url.correlation_id);
    }
    assert_eq!(store.list_urls_by_user_id(&owner.id).await.unwrap().len(), 3);

    store.batch_create_url(&owner.id, Vec::new()).await.unwrap();
}

pub async fn delete_by_non_owner_is_noop(store: &dyn Store) {
    let owner = registered_user(store).await;
    let stranger = registered_user(store).await;
    let url = store
        .create_url(&owner.id, random_url(&random_original()))
        .await
        .unwrap();

    store.soft_delete_url(&stranger.id, &url.slug).await.unwrap();

    assert!(!store.get_url(&url.slug).await.unwrap().deleted);
    assert_eq!(store.list_urls_by_user_id(&owner.id).await.unwrap().len(), 1);

    assert!(matches!(
        store.soft_delete_url(&owner.id, "nOsUcHsL").await,
        Err(StoreError::UrlNotFound(_))
    ));
}

pub async fn relinking_revives_tombstone(store: &dyn Store) {
    let a = registered_user(store).await;
    let b = registered_user(store).await;
    let original = random_original();

    let url = store.create_url(&a.id, random_url(&original)).await.unwrap();
    store.soft_delete_url(&a.id, &url.slug).await.unwrap();
    assert!(store.get_url(&url.slug).await.unwrap().deleted);

    let existing = expect_already_exists(store.create_url(&b.id, random_url(&original)).await);

    assert_eq!(existing.slug, url.slug);
    assert!(!store.get_url(&url.slug).await.unwrap().deleted);
    assert!(store.list_urls_by_user_id(&a.id).await.unwrap().is_empty());
}

pub async fn concurrent_create_same_original(store: Arc<dyn Store>) {
    let original = random_original();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let original = original.clone();
        handles.push(tokio::spawn(async move {
            let user = User::new();
            store.create_user(user.clone()).await.unwrap();
            store.create_url(&user.id, random_url(&original)).await
        }));
    }

    let mut slugs = Vec::new();
    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(url) => {
                created += 1;
                slugs.push(url.slug);
            }
            Err(StoreError::AlreadyExists { existing }) => slugs.push(existing.slug),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    slugs.dedup();
    assert_eq!(slugs.len(), 1);
}

/// Runs the last owner's delete alongside a second owner linking the same
/// original. Whichever commits first, the url must end up live and linked.
pub async fn concurrent_delete_and_relink(store: Arc<dyn Store>) {
    for round in 0..50 {
        let a = registered_user(store.as_ref()).await;
        let b = registered_user(store.as_ref()).await;
        let original = random_original();
        let url = store.create_url(&a.id, random_url(&original)).await.unwrap();

        let (deleted, relinked) = tokio::join!(
            store.soft_delete_url(&a.id, &url.slug),
            store.create_url(&b.id, random_url(&original)),
        );
        deleted.unwrap();
        assert_eq!(expect_already_exists(relinked).slug, url.slug);

        let listed = store.list_urls_by_user_id(&b.id).await.unwrap();
        assert!(
            listed.iter().any(|u| u.slug == url.slug),
            "round {round}: second owner lost its link"
        );
        assert!(
            !store.get_url(&url.slug).await.unwrap().deleted,
            "round {round}: url tombstoned while linked"
        );
    }
}

pub async fn ping(store: &dyn Store) {
    store.ping().await.unwrap();
}
