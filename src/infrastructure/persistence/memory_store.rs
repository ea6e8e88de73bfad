//! In-memory [`Store`] backend.
//!
//! All state lives behind one mutex and is lost on exit. This is the
//! reference backend the conformance tests are written against.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::state::StoreState;
use crate::domain::entities::{Url, User};
use crate::domain::repositories::{Store, StoreResult};

/// Process-local store with no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: User) -> StoreResult<()> {
        self.state.lock().await.create_user(user);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        self.state.lock().await.get_user(user_id)
    }

    async fn create_url(&self, user_id: &str, url: Url) -> StoreResult<Url> {
        self.state.lock().await.create_url(user_id, url)
    }

    async fn batch_create_url(&self, user_id: &str, urls: Vec<Url>) -> StoreResult<()> {
        self.state.lock().await.batch_create_url(user_id, urls)
    }

    async fn get_url(&self, slug: &str) -> StoreResult<Url> {
        self.state.lock().await.get_url(slug)
    }

    async fn list_urls_by_user_id(&self, user_id: &str) -> StoreResult<Vec<Url>> {
        Ok(self.state.lock().await.list_urls_by_user_id(user_id))
    }

    async fn soft_delete_url(&self, user_id: &str, slug: &str) -> StoreResult<()> {
        self.state.lock().await.soft_delete_url(user_id, slug)?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
