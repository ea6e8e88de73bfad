//! Core domain entities representing the storage data model.
//!
//! Entities are plain data structures shared by every store backend. They
//! carry no persistence logic of their own.
//!
//! # Entity Types
//!
//! - [`Url`] - A shortened URL row, looked up by its slug
//! - [`User`] - An (anonymous) owner of shortened URLs
//! - [`UserUrl`] - The ownership link between a user and a URL
//!
//! URLs and links are never physically removed; both carry a soft-delete
//! flag. A URL is tombstoned only once every link pointing at it is deleted.

pub mod url;
pub mod user;
pub mod user_url;

pub use url::Url;
pub use user::User;
pub use user_url::UserUrl;
