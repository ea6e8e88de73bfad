//! Runtime wiring: store selection, delete worker and shutdown.

use crate::config::{Config, StorageKind};
use crate::domain::delete_worker::{delete_queue, run_delete_worker};
use crate::domain::repositories::Store;
use crate::infrastructure::persistence::{FileStore, MemoryStore, PgStore};
use crate::state::AppState;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Attempts made to reach PostgreSQL before giving up.
const CONNECT_ATTEMPTS: usize = 5;

/// A running application: shared state plus the delete worker task.
pub struct App {
    pub state: AppState,
    worker: JoinHandle<()>,
}

impl App {
    /// Stops accepting deletions and waits for the worker's final flush.
    ///
    /// Clones of [`App::state`] still alive elsewhere keep the worker
    /// running; drop them first.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker task panicked.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.state);
        self.worker.await.context("Delete worker failed")?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

/// Builds the store selected by `config`.
///
/// # Errors
///
/// Returns an error if:
/// - PostgreSQL stays unreachable after several attempts
/// - Migrations fail
/// - The snapshot file cannot be read or parsed
pub async fn connect_store(config: &Config) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.storage() {
        StorageKind::Postgres(dsn) => {
            let pool = connect_pool(&dsn, config).await?;
            tracing::info!("Connected to database");
            Arc::new(
                PgStore::new(Arc::new(pool))
                    .await
                    .context("Failed to migrate")?,
            )
        }
        StorageKind::File(path) => Arc::new(
            FileStore::open(&path)
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        StorageKind::Memory => {
            tracing::info!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(store)
}

async fn connect_pool(dsn: &str, config: &Config) -> Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Some(Duration::from_secs(config.db_idle_timeout)))
        .max_lifetime(Some(Duration::from_secs(config.db_max_lifetime)));

    // 100ms, 200ms, 400ms, ... with jitter
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(50)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(CONNECT_ATTEMPTS - 1);

    Retry::spawn(strategy, || {
        let options = options.clone();
        async move {
            options.connect(dsn).await.inspect_err(|e| {
                tracing::warn!(error = %e, "Database connection attempt failed");
            })
        }
    })
    .await
    .context("Failed to connect to database")
}

/// Opens the configured store and starts the delete worker.
///
/// # Errors
///
/// See [`connect_store`].
pub async fn start(config: &Config) -> Result<App> {
    let store = connect_store(config).await?;
    Ok(start_with_store(store, config))
}

/// Starts the delete worker over an already opened store.
pub fn start_with_store(store: Arc<dyn Store>, config: &Config) -> App {
    let (delete_tx, delete_rx) = delete_queue(config.delete_queue_capacity);

    let worker = tokio::spawn(run_delete_worker(
        delete_rx,
        Arc::clone(&store),
        config.flush_interval(),
    ));
    tracing::info!(
        capacity = config.delete_queue_capacity,
        interval_secs = config.delete_flush_interval,
        "Delete worker started"
    );

    let state = AppState::new(store, config, delete_tx);

    App { state, worker }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Url;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_deletions() {
        let config = Config::default();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .create_url("u1", Url::new("aaaaaaaa", "http://example.org"))
            .await
            .unwrap();

        let app = start_with_store(Arc::clone(&store), &config);
        app.state
            .links
            .request_deletion("u1", vec!["aaaaaaaa".into()])
            .await
            .unwrap();

        app.shutdown().await.unwrap();

        assert!(store.get_url("aaaaaaaa").await.unwrap().deleted);
    }

    #[tokio::test]
    async fn test_connect_store_defaults_to_memory() {
        let config = Config::default();
        let store = connect_store(&config).await.unwrap();

        assert!(store.ping().await.is_ok());
    }
}
