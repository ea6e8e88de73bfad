//! Infrastructure layer for external integrations.
//!
//! This layer implements the [`crate::domain::repositories::Store`] contract
//! defined by the domain layer.
//!
//! # Modules
//!
//! - [`persistence`] - In-memory, file and PostgreSQL store backends

pub mod persistence;
