//! Store contract for the domain layer.
//!
//! The [`Store`] trait is the single polymorphic interface every storage
//! backend satisfies. Implementations live in
//! `crate::infrastructure::persistence`:
//!
//! - `MemoryStore` - process-local, lost on exit
//! - `FileStore` - process-local, snapshotted to a JSON file
//! - `PgStore` - PostgreSQL
//!
//! Mock implementations are auto-generated via `mockall` for testing.
//!
//! # Testing
//!
//! See integration tests in `tests/store_*.rs` for the conformance scenarios
//! shared by all backends.

pub mod store;

pub use store::{Store, StoreError, StoreResult};

#[cfg(test)]
pub use store::MockStore;
