use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// User account. Ownership anchor for feeds and follows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Registered feed.
///
/// `last_fetched_at` is null until the feed is first claimed by a poller;
/// the claim operation stamps it before any network I/O happens.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub last_fetched_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Feed joined with the name of the user who registered it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithCreator {
    pub name: String,
    pub url: String,
    pub creator: String,
}

/// Ingested feed entry. Immutable once created; `url` is unique across all
/// posts and serves as the dedup key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Candidate post built from one parsed feed entry.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
}
