//! Remote row store port.
//!
//! The reading app keeps per-user likes, reads, views, favorites and roles in
//! named tables, every row scoped by `user_id`. This module defines the port
//! the toggle sets talk to; adapters live in submodules:
//!
//! - [`sqlite::SqliteStore`] - local SQLite file (or in-memory for tests)
//! - [`rest::RestStore`] - PostgREST-style HTTP backend
//!
//! # Design Rules
//!
//! - No `sqlx` or `reqwest` types in signatures
//! - Duplicate inserts surface as [`StoreError::Conflict`], never as a
//!   message that callers have to match on

pub mod rest;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Tables exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ArticleLikes,
    ArticleReads,
    ArticleViews,
    Favorites,
    UserRoles,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::ArticleLikes => "article_likes",
            Table::ArticleReads => "article_reads",
            Table::ArticleViews => "article_views",
            Table::Favorites => "favorites",
            Table::UserRoles => "user_roles",
        }
    }

    /// Column holding the item identifier next to `user_id`.
    pub fn key_column(self) -> &'static str {
        match self {
            Table::ArticleLikes | Table::ArticleReads | Table::ArticleViews => "article_id",
            Table::Favorites => "category",
            Table::UserRoles => "role",
        }
    }

    pub fn timestamp_column(self) -> Option<&'static str> {
        match self {
            Table::ArticleLikes | Table::Favorites => Some("created_at"),
            Table::ArticleReads => Some("read_at"),
            Table::ArticleViews | Table::UserRoles => None,
        }
    }

    /// Whether `(user_id, key)` is unique. Views are an append-only log.
    pub fn is_keyed(self) -> bool {
        !matches!(self, Table::ArticleViews)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row to insert. `category` is only meaningful for `article_views`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub user_id: String,
    pub key: String,
    pub category: Option<String>,
}

impl NewRow {
    pub fn new(user_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            key: key.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Row returned by the `get_all_users_for_admin` procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result of the `get_user_stats_for_admin` procedure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub favorites_count: i64,
    pub categories_read: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A row with the same `(user_id, key)` already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend rejected the credentials or the caller's privileges.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Network, query or storage failure.
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Row-level access to the backend tables plus its two admin procedures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Key column values of `table` for `user_id`, oldest row first.
    async fn select_keys(&self, table: Table, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn insert(&self, table: Table, row: NewRow) -> Result<(), StoreError>;

    /// Delete the rows matching `(user_id, key)`.
    async fn delete(&self, table: Table, user_id: &str, key: &str) -> Result<(), StoreError>;

    /// Category column of the user's `article_views` rows, oldest first.
    async fn select_view_categories(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn get_all_users_for_admin(&self) -> Result<Vec<AdminUser>, StoreError>;

    async fn get_user_stats_for_admin(&self, user_id: &str) -> Result<UserStats, StoreError>;
}
