//! PostgreSQL implementation of [`Store`].
//!
//! Schema lives in `migrations/` and is applied by [`PgStore::new`]. No
//! process-level lock is taken: dedup races are settled by the
//! `urls_original_url_key` constraint, and soft deletes lock the URL row for
//! the length of their transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::entities::{Url, User};
use crate::domain::repositories::{Store, StoreError, StoreResult};
use crate::utils::db_error::{ORIGINAL_URL_CONSTRAINT, classify, is_unique_violation_on};

#[derive(sqlx::FromRow)]
struct UrlRow {
    id: String,
    correlation_id: String,
    slug: String,
    original_url: String,
    created_at: DateTime<Utc>,
    is_deleted: bool,
}

impl From<UrlRow> for Url {
    fn from(row: UrlRow) -> Self {
        Self {
            id: row.id,
            correlation_id: row.correlation_id,
            slug: row.slug,
            original: row.original_url,
            created_at: row.created_at,
            deleted: row.is_deleted,
        }
    }
}

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Wraps `pool` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if the schema cannot be brought up
    /// to date.
    pub async fn new(pool: Arc<PgPool>) -> StoreResult<Self> {
        sqlx::migrate!("./migrations").run(pool.as_ref()).await?;
        info!("Database migrations applied");

        Ok(Self { pool })
    }

    async fn find_by_original(&self, original: &str) -> StoreResult<Option<Url>> {
        let row = sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT id, correlation_id, slug, original_url, created_at, is_deleted
            FROM urls
            WHERE original_url = $1
            "#,
        )
        .bind(original)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Url::from))
    }

    /// Links `user_id` to an existing row, reviving the owner's previous link
    /// and the row's tombstone if either was set.
    ///
    /// The url row is locked before the link is written, so a concurrent
    /// [`Store::soft_delete_url`] either counts this link or commits its
    /// tombstone first and has it cleared here.
    async fn link_existing(&self, user_id: &str, mut existing: Url) -> StoreResult<Url> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<String> =
            sqlx::query_scalar("SELECT id FROM urls WHERE id = $1 FOR UPDATE")
                .bind(&existing.id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Err(StoreError::UrlNotFound(existing.slug));
        }

        sqlx::query("UPDATE urls SET is_deleted = FALSE WHERE id = $1 AND is_deleted")
            .bind(&existing.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_urls (id, user_id, url_id, is_deleted, created_at)
            VALUES ($1, $2, $3, FALSE, NOW())
            ON CONFLICT (user_id, url_id) DO UPDATE SET is_deleted = FALSE
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(&existing.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(user_id, slug = %existing.slug, "Linked user to existing url");
        existing.deleted = false;
        Ok(existing)
    }

    /// Resolves `original` to its stored row after losing an insert race.
    async fn recover_duplicate(&self, user_id: &str, original: &str) -> StoreResult<Url> {
        let existing = self
            .find_by_original(original)
            .await?
            .ok_or_else(|| StoreError::UrlNotFound(original.to_string()))?;

        self.link_existing(user_id, existing).await
    }
}

async fn insert_url(tx: &mut Transaction<'_, Postgres>, url: &Url) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO urls (id, correlation_id, slug, original_url, created_at, is_deleted)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        "#,
    )
    .bind(&url.id)
    .bind(&url.correlation_id)
    .bind(&url.slug)
    .bind(&url.original)
    .bind(url.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_link(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    url: &Url,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_urls (id, user_id, url_id, is_deleted, created_at)
        VALUES ($1, $2, $3, FALSE, $4)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&url.id)
    .bind(url.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, created_at) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(&user.id)
            .bind(user.created_at)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT id, created_at FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        row.map(|(id, created_at)| User { id, created_at })
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    async fn create_url(&self, user_id: &str, url: Url) -> StoreResult<Url> {
        if let Some(existing) = self.find_by_original(&url.original).await? {
            let existing = self.link_existing(user_id, existing).await?;
            return Err(StoreError::AlreadyExists { existing });
        }

        let mut tx = self.pool.begin().await?;

        if let Err(e) = insert_url(&mut tx, &url).await {
            if is_unique_violation_on(&e, ORIGINAL_URL_CONSTRAINT) {
                tx.rollback().await?;
                debug!(original = %url.original, "Lost insert race, linking to existing url");
                let existing = self.recover_duplicate(user_id, &url.original).await?;
                return Err(StoreError::AlreadyExists { existing });
            }
            return Err(classify(e));
        }

        insert_link(&mut tx, user_id, &url).await.map_err(classify)?;
        tx.commit().await?;

        Ok(url)
    }

    async fn batch_create_url(&self, user_id: &str, urls: Vec<Url>) -> StoreResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for url in &urls {
            insert_url(&mut tx, url).await.map_err(classify)?;
            insert_link(&mut tx, user_id, url).await.map_err(classify)?;
        }

        tx.commit().await?;

        debug!(user_id, count = urls.len(), "Batch stored");
        Ok(())
    }

    async fn get_url(&self, slug: &str) -> StoreResult<Url> {
        let row = sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT id, correlation_id, slug, original_url, created_at, is_deleted
            FROM urls
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Url::from)
            .ok_or_else(|| StoreError::UrlNotFound(slug.to_string()))
    }

    async fn list_urls_by_user_id(&self, user_id: &str) -> StoreResult<Vec<Url>> {
        let rows = sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT u.id, u.correlation_id, u.slug, u.original_url, u.created_at, u.is_deleted
            FROM urls u
            JOIN user_urls l ON l.url_id = u.id
            WHERE l.user_id = $1 AND NOT l.is_deleted
            ORDER BY l.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Url::from).collect())
    }

    async fn soft_delete_url(&self, user_id: &str, slug: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let url_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM urls WHERE slug = $1 FOR UPDATE")
                .bind(slug)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(url_id) = url_id else {
            return Err(StoreError::UrlNotFound(slug.to_string()));
        };

        let unlinked = sqlx::query(
            "UPDATE user_urls SET is_deleted = TRUE WHERE user_id = $1 AND url_id = $2 AND NOT is_deleted",
        )
        .bind(user_id)
        .bind(&url_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if unlinked > 0 {
            let live: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM user_urls WHERE url_id = $1 AND NOT is_deleted",
            )
            .bind(&url_id)
            .fetch_one(&mut *tx)
            .await?;

            if live == 0 {
                sqlx::query("UPDATE urls SET is_deleted = TRUE WHERE id = $1")
                    .bind(&url_id)
                    .execute(&mut *tx)
                    .await?;
                debug!(slug, "Url tombstoned");
            }
        }

        tx.commit().await?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
