//! Store backend implementations.
//!
//! # Backends
//!
//! - [`MemoryStore`] - Mutex-guarded maps, nothing persisted
//! - [`FileStore`] - Same maps, snapshotted to one JSON file after every mutation
//! - [`PgStore`] - PostgreSQL, schema bootstrapped from embedded migrations
//!
//! The two process-local backends share [`StoreState`], which owns the
//! dedup and reference-counted soft-delete rules for them.

pub mod file_store;
pub mod memory_store;
pub mod pg_store;
pub mod state;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use state::StoreState;
