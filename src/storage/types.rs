use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The article database is locked by another process")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

// SQLITE_BUSY (5) and SQLITE_LOCKED (6). SQLITE_CANTOPEN is a path or
// permission problem and stays a plain error.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
}

// ============================================================================
// Data Structures
// ============================================================================

/// A normalized entry ready to be stored.
///
/// Produced by the normalizer; `published` is already resolved into the
/// reference timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub link: String,
    pub published: DateTime<Tz>,
    pub summary: String,
}

/// A stored article.
///
/// Articles are immutable once inserted; `id` is assigned by SQLite and is
/// never reused (`AUTOINCREMENT`).
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub summary: String,
}

impl Article {
    /// Publication time in the given display timezone.
    pub fn published_in(&self, tz: Tz) -> DateTime<Tz> {
        tz.from_utc_datetime(&self.published.naive_utc())
    }
}

/// Internal row type for Article queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleDbRow {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub published: i64,
    pub summary: String,
}

impl ArticleDbRow {
    pub(crate) fn into_article(self) -> Article {
        Article {
            id: self.id,
            title: self.title,
            link: self.link,
            published: DateTime::from_timestamp(self.published, 0).unwrap_or_default(),
            summary: self.summary,
        }
    }
}
