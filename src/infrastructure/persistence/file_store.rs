//! File-persisted [`Store`] backend.
//!
//! Keeps the same maps as [`MemoryStore`](super::MemoryStore) and writes a
//! full JSON snapshot after every mutation. The snapshot is loaded once in
//! [`FileStore::open`].
//!
//! # Write discipline
//!
//! Each mutation runs against a copy of the state while the lock is held.
//! The copy is written to `<path>.tmp` and renamed over `<path>`; only then
//! does it replace the in-memory state. A failed write leaves both memory and
//! disk as they were.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::state::StoreState;
use crate::domain::entities::{Url, User};
use crate::domain::repositories::{Store, StoreError, StoreResult};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStore {
    /// Loads the snapshot at `path`.
    ///
    /// A missing file or one holding only whitespace yields an empty store.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if the file exists but cannot be read
    /// - [`StoreError::Serialization`] if the file is not a valid snapshot
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreState::new(),
            Ok(bytes) => StoreState::decode(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            urls = state.url_count(),
            "File store loaded"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `op` to a copy of the state, persists the copy and installs it.
    ///
    /// [`StoreError::AlreadyExists`] still commits: the dedup path records a
    /// new link before reporting the existing row.
    async fn commit<T>(
        &self,
        op: impl FnOnce(&mut StoreState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        let result = op(&mut next);
        if result
            .as_ref()
            .is_err_and(|e| !matches!(e, StoreError::AlreadyExists { .. }))
        {
            return result;
        }

        self.persist(&next).await?;
        *guard = next;

        result
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let bytes = state.encode()?;
        let tmp = self.path.with_extension("tmp");

        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn create_user(&self, user: User) -> StoreResult<()> {
        self.commit(|state| {
            state.create_user(user);
            Ok(())
        })
        .await
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        self.state.lock().await.get_user(user_id)
    }

    async fn create_url(&self, user_id: &str, url: Url) -> StoreResult<Url> {
        self.commit(|state| state.create_url(user_id, url)).await
    }

    async fn batch_create_url(&self, user_id: &str, urls: Vec<Url>) -> StoreResult<()> {
        if urls.is_empty() {
            return Ok(());
        }
        self.commit(|state| state.batch_create_url(user_id, urls)).await
    }

    async fn get_url(&self, slug: &str) -> StoreResult<Url> {
        self.state.lock().await.get_url(slug)
    }

    async fn list_urls_by_user_id(&self, user_id: &str) -> StoreResult<Vec<Url>> {
        Ok(self.state.lock().await.list_urls_by_user_id(user_id))
    }

    async fn soft_delete_url(&self, user_id: &str, slug: &str) -> StoreResult<()> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        if next.soft_delete_url(user_id, slug)? {
            self.persist(&next).await?;
            *guard = next;
        }

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
