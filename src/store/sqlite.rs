//! `SQLite` implementation of the [`RemoteStore`] port.
//!
//! Stands in for the hosted backend during local use: same tables, same
//! `(user_id, key)` uniqueness, and the two admin procedures expressed as
//! aggregate queries.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::{AdminUser, NewRow, RemoteStore, StoreError, Table, UserStats};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS article_likes (
        user_id TEXT NOT NULL,
        article_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, article_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_reads (
        user_id TEXT NOT NULL,
        article_id TEXT NOT NULL,
        read_at TEXT NOT NULL,
        PRIMARY KEY (user_id, article_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_views (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        article_id TEXT NOT NULL,
        category TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_article_views_user ON article_views(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS favorites (
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, category)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id TEXT NOT NULL,
        role TEXT NOT NULL,
        PRIMARY KEY (user_id, role)
    )
    "#,
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Remote(e.to_string()))?;
        }
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        )
        .await
        .map_err(map_sqlx)?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        tracing::debug!(path = %path.display(), "Opened SQLite store");
        Ok(store)
    }

    /// Fresh in-memory database with the full schema.
    ///
    /// Pinned to one connection: every `sqlite::memory:` connection would
    /// otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(map_sqlx)?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
        }
        Ok(())
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return StoreError::Conflict(db.message().to_string());
    }
    StoreError::Remote(e.to_string())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn select_keys(&self, table: Table, user_id: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT {key} AS key FROM {table} WHERE user_id = ? ORDER BY rowid",
            key = table.key_column(),
            table = table.name()
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("key").map_err(map_sqlx))
            .collect()
    }

    async fn insert(&self, table: Table, row: NewRow) -> Result<(), StoreError> {
        let result = match (table, table.timestamp_column()) {
            (Table::ArticleViews, _) => {
                let category = row.category.ok_or_else(|| {
                    StoreError::Remote("article_views rows need a category".to_string())
                })?;
                sqlx::query(
                    "INSERT INTO article_views (user_id, article_id, category) VALUES (?, ?, ?)",
                )
                .bind(&row.user_id)
                .bind(&row.key)
                .bind(category)
                .execute(&self.pool)
                .await
            }
            (_, Some(ts)) => {
                let sql = format!(
                    "INSERT INTO {table} (user_id, {key}, {ts}) VALUES (?, ?, ?)",
                    table = table.name(),
                    key = table.key_column(),
                );
                sqlx::query(&sql)
                    .bind(&row.user_id)
                    .bind(&row.key)
                    .bind(now())
                    .execute(&self.pool)
                    .await
            }
            (_, None) => {
                let sql = format!(
                    "INSERT INTO {table} (user_id, {key}) VALUES (?, ?)",
                    table = table.name(),
                    key = table.key_column(),
                );
                sqlx::query(&sql)
                    .bind(&row.user_id)
                    .bind(&row.key)
                    .execute(&self.pool)
                    .await
            }
        };
        result.map(|_| ()).map_err(map_sqlx)
    }

    async fn delete(&self, table: Table, user_id: &str, key: &str) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {table} WHERE user_id = ? AND {key} = ?",
            table = table.name(),
            key = table.key_column()
        );
        sqlx::query(&sql)
            .bind(user_id)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn select_view_categories(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT category FROM article_views WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("category").map_err(map_sqlx))
            .collect()
    }

    async fn get_all_users_for_admin(&self) -> Result<Vec<AdminUser>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT u.user_id AS id,
                   (SELECT role FROM user_roles r
                     WHERE r.user_id = u.user_id
                     ORDER BY r.rowid LIMIT 1) AS role
              FROM (SELECT user_id FROM article_likes
                    UNION SELECT user_id FROM article_reads
                    UNION SELECT user_id FROM article_views
                    UNION SELECT user_id FROM favorites
                    UNION SELECT user_id FROM user_roles) u
             ORDER BY u.user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.iter()
            .map(|r| {
                Ok(AdminUser {
                    id: r.try_get("id").map_err(map_sqlx)?,
                    email: None,
                    role: r.try_get("role").map_err(map_sqlx)?,
                    created_at: None,
                })
            })
            .collect()
    }

    async fn get_user_stats_for_admin(&self, user_id: &str) -> Result<UserStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT (SELECT COUNT(*) FROM favorites WHERE user_id = ?1) AS favorites_count,
                   (SELECT COUNT(DISTINCT category) FROM article_views WHERE user_id = ?1)
                       AS categories_read
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(UserStats {
            favorites_count: row.try_get("favorites_count").map_err(map_sqlx)?,
            categories_read: row.try_get("categories_read").map_err(map_sqlx)?,
        })
    }
}
