use super::schema::Database;
use super::types::{DatabaseError, Feed, FeedWithCreator};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed. Fails if the URL is already registered (UNIQUE).
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, url, user_id, last_fetched_at, created_at, updated_at
        "#,
        )
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Look up a feed by its canonical URL.
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
            FROM feeds
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// All feeds with the name of the user who registered each.
    pub async fn list_feeds_with_creators(&self) -> Result<Vec<FeedWithCreator>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedWithCreator>(
            r#"
            SELECT f.name, f.url, u.name AS creator
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.id ASC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Atomically claim the stalest feed that is due for fetching.
    ///
    /// A feed is due when it has never been fetched or its last fetch is at
    /// least `min_age` ago; among due feeds the oldest `last_fetched_at`
    /// wins (never-fetched first, ties broken by id). The winner is stamped
    /// with the current time in the same statement, and SQLite serializes
    /// writers, so two pollers sharing this database can never claim the
    /// same feed within one `min_age` window — the loser sees the next
    /// stalest feed, or `None` when nothing is due.
    ///
    /// `min_age` of zero claims the stalest feed unconditionally.
    pub async fn claim_next_feed(
        &self,
        min_age: std::time::Duration,
    ) -> Result<Option<Feed>, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let cutoff = now - min_age.as_secs() as i64;
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            UPDATE feeds
            SET last_fetched_at = ?, updated_at = ?
            WHERE id = (
                SELECT id FROM feeds
                WHERE last_fetched_at IS NULL OR last_fetched_at <= ?
                ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
                LIMIT 1
            )
            RETURNING id, name, url, user_id, last_fetched_at, created_at, updated_at
        "#,
        )
        .bind(now)
        .bind(now)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Stamp a feed's `last_fetched_at` with the current time.
    ///
    /// The poller relies on `claim_next_feed`, which folds the stamp into
    /// the claim; this standalone form exists for callers that fetched a
    /// specific feed outside the staleness rotation.
    pub async fn mark_feed_fetched(&self, feed_id: i64) -> Result<(), DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
