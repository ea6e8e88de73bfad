//! Application layer services.
//!
//! Services sit between callers (the command-line front end, or any other
//! request-handling layer) and the [`Store`](crate::domain::repositories::Store)
//! contract: they validate input, build short links and map store errors to
//! [`AppError`](crate::error::AppError).
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Shortening, lookup, listing and queued deletion
//! - [`services::session_service::SessionService`] - Anonymous users and signed bearer tokens

pub mod dto;
pub mod services;
