//! Domain layer containing the storage model and its consistency rules.
//!
//! # Architecture
//!
//! - [`entities`] - URL, user and ownership-link data structures
//! - [`repositories`] - The [`repositories::Store`] contract and its errors
//! - [`delete_request`] - Deletion request message
//! - [`delete_worker`] - Batched asynchronous deletion worker
//!
//! # Deletion Flow
//!
//! 1. The caller asks to delete some of its slugs
//! 2. One [`delete_request::DeleteRequest`] per slug is pushed onto a bounded channel
//! 3. [`delete_worker::run_delete_worker`] batches requests and flushes them on a timer
//! 4. Each request becomes one [`repositories::Store::soft_delete_url`] call

pub mod delete_request;
pub mod delete_worker;
pub mod entities;
pub mod repositories;
