//! Shared state of the process-local backends.
//!
//! [`StoreState`] holds the three maps that back both
//! [`MemoryStore`](super::MemoryStore) and [`FileStore`](super::FileStore):
//!
//! - `urls` - URL rows keyed by slug
//! - `users` - user rows keyed by id
//! - `user_urls` - ownership links keyed by owner id, in insertion order
//!
//! The state itself does no locking. Each backend wraps it in a single mutex
//! and calls these methods with the lock held, so every method here sees a
//! consistent snapshot and mutates it as one unit.
//!
//! The serialized form is the file backend's snapshot layout:
//!
//! ```json
//! {
//!   "urls": { "<slug>": { "id": "...", "slug": "...", "original_url": "...", ... } },
//!   "users": { "<id>": { "id": "...", "created_at": "..." } },
//!   "user_urls": { "<user id>": [ { "slug": "...", "id": "...", "url_id": "...", ... } ] }
//! }
//! ```
//!
//! Older snapshots stored a bare list of slugs per owner; [`StoreState::decode`]
//! still accepts those and rebuilds the link rows from them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::entities::{Url, User, UserUrl};
use crate::domain::repositories::{StoreError, StoreResult};
use crate::utils::db_error::SLUG_CONSTRAINT;

/// An ownership link together with the slug it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedSlug {
    pub slug: String,
    #[serde(flatten)]
    pub link: UserUrl,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreState {
    urls: HashMap<String, Url>,
    users: HashMap<String, User>,
    user_urls: HashMap<String, Vec<OwnedSlug>>,
}

/// On-disk shape as read back. Every map may be `null` or missing.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    urls: Option<HashMap<String, Url>>,
    users: Option<HashMap<String, User>>,
    user_urls: Option<HashMap<String, Option<Vec<SnapshotLink>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotLink {
    Link(OwnedSlug),
    Slug(String),
}

impl From<Snapshot> for StoreState {
    fn from(snapshot: Snapshot) -> Self {
        let urls = snapshot.urls.unwrap_or_default();
        let users = snapshot.users.unwrap_or_default();

        let user_urls = snapshot
            .user_urls
            .unwrap_or_default()
            .into_iter()
            .map(|(user_id, links)| {
                let links = links
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|entry| match entry {
                        SnapshotLink::Link(owned) => Some(owned),
                        SnapshotLink::Slug(slug) => {
                            let url = urls.get(&slug)?;
                            let mut link = UserUrl::new(user_id.clone(), url.id.clone());
                            link.created_at = url.created_at;
                            Some(OwnedSlug { slug, link })
                        }
                    })
                    .collect();
                (user_id, links)
            })
            .collect();

        Self {
            urls,
            users,
            user_urls,
        }
    }
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if `bytes` is not a valid
    /// snapshot.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        Ok(snapshot.into())
    }

    /// Serializes the whole state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] on encoder failure.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn url_count(&self) -> usize {
        self.urls.len()
    }

    pub fn create_user(&mut self, user: User) {
        self.users.entry(user.id.clone()).or_insert(user);
    }

    pub fn get_user(&self, user_id: &str) -> StoreResult<User> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    /// Linear scan over every row, tombstoned ones included.
    /// Batches may store the same original twice; the oldest row wins, ties
    /// broken by slug, so dedup always answers with the same slug.
    fn find_by_original(&self, original: &str) -> Option<&Url> {
        self.urls
            .values()
            .filter(|url| url.original == original)
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.slug.cmp(&b.slug))
            })
    }

    /// Inserts `url` and links it to `user_id`, or links `user_id` to the row
    /// that already holds the same original.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] when the original was known; the link
    ///   has been recorded regardless.
    /// - [`StoreError::IntegrityViolation`] when the slug is taken by a
    ///   different original; nothing is changed.
    pub fn create_url(&mut self, user_id: &str, url: Url) -> StoreResult<Url> {
        if let Some(slug) = self.find_by_original(&url.original).map(|u| u.slug.clone())
            && let Some(existing) = self.urls.get_mut(&slug)
        {
            existing.deleted = false;
            let existing = existing.clone();
            self.link_existing(user_id, &existing);
            return Err(StoreError::AlreadyExists { existing });
        }

        if self.urls.contains_key(&url.slug) {
            return Err(StoreError::IntegrityViolation {
                constraint: SLUG_CONSTRAINT.to_string(),
            });
        }

        self.insert_linked(user_id, url.clone());
        Ok(url)
    }

    /// Inserts every URL with a link to `user_id`.
    ///
    /// All slugs are checked before anything is written, so a failure leaves
    /// the state exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IntegrityViolation`] if any slug is already
    /// stored or repeats within the batch.
    pub fn batch_create_url(&mut self, user_id: &str, urls: Vec<Url>) -> StoreResult<()> {
        {
            let mut seen = HashSet::with_capacity(urls.len());
            for url in &urls {
                if self.urls.contains_key(&url.slug) || !seen.insert(url.slug.as_str()) {
                    return Err(StoreError::IntegrityViolation {
                        constraint: SLUG_CONSTRAINT.to_string(),
                    });
                }
            }
        }

        for url in urls {
            self.insert_linked(user_id, url);
        }

        Ok(())
    }

    pub fn get_url(&self, slug: &str) -> StoreResult<Url> {
        self.urls
            .get(slug)
            .cloned()
            .ok_or_else(|| StoreError::UrlNotFound(slug.to_string()))
    }

    /// URLs behind the live links of `user_id`, in link order.
    pub fn list_urls_by_user_id(&self, user_id: &str) -> Vec<Url> {
        let Some(links) = self.user_urls.get(user_id) else {
            return Vec::new();
        };

        links
            .iter()
            .filter(|owned| !owned.link.deleted)
            .filter_map(|owned| self.urls.get(&owned.slug).cloned())
            .collect()
    }

    /// Marks the links from `user_id` to `slug` deleted and tombstones the URL
    /// once no owner holds a live link to it.
    ///
    /// Returns whether anything changed. A slug the user does not own is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UrlNotFound`] if the slug is unknown.
    pub fn soft_delete_url(&mut self, user_id: &str, slug: &str) -> StoreResult<bool> {
        if !self.urls.contains_key(slug) {
            return Err(StoreError::UrlNotFound(slug.to_string()));
        }

        let mut changed = false;
        if let Some(links) = self.user_urls.get_mut(user_id) {
            for owned in links
                .iter_mut()
                .filter(|owned| owned.slug == slug && !owned.link.deleted)
            {
                owned.link.deleted = true;
                changed = true;
            }
        }

        if !changed {
            return Ok(false);
        }

        if self.live_link_count(slug) == 0
            && let Some(url) = self.urls.get_mut(slug)
        {
            url.deleted = true;
        }

        Ok(true)
    }

    fn live_link_count(&self, slug: &str) -> usize {
        self.user_urls
            .values()
            .flatten()
            .filter(|owned| owned.slug == slug && !owned.link.deleted)
            .count()
    }

    fn insert_linked(&mut self, user_id: &str, url: Url) {
        let link = UserUrl::new(user_id, url.id.clone());
        self.user_urls
            .entry(user_id.to_string())
            .or_default()
            .push(OwnedSlug {
                slug: url.slug.clone(),
                link,
            });
        self.urls.insert(url.slug.clone(), url);
    }

    /// Links `user_id` to `url`, reusing the owner's previous link if there
    /// is one.
    fn link_existing(&mut self, user_id: &str, url: &Url) {
        let links = self.user_urls.entry(user_id.to_string()).or_default();

        match links.iter_mut().find(|owned| owned.slug == url.slug) {
            Some(owned) => owned.link.deleted = false,
            None => links.push(OwnedSlug {
                slug: url.slug.clone(),
                link: UserUrl::new(user_id, url.id.clone()),
            }),
        }
    }
}
