//! Utility functions shared across layers.
//!
//! - [`slug`] - Short slug generation and validation
//! - [`db_error`] - PostgreSQL constraint violation classification

pub mod db_error;
pub mod slug;
