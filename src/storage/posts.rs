use super::schema::Database;
use super::types::{DatabaseError, NewPost, Post};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post, ignoring it if the entry URL is already ingested.
    ///
    /// The UNIQUE constraint on `posts.url` is the dedup mechanism: the
    /// constraint lives in the storage layer, so concurrent pollers racing
    /// to insert the same entry cannot both win. Returns `None` when the
    /// URL already existed.
    pub async fn insert_post(&self, post: &NewPost) -> Result<Option<Post>, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let inserted = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (feed_id, url, title, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            RETURNING id, feed_id, url, title, description, published_at, created_at, updated_at
        "#,
        )
        .bind(post.feed_id)
        .bind(&post.url)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted)
    }

    /// All posts for a feed, newest first.
    pub async fn posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, url, title, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Recent posts from the feeds a user follows, newest first.
    pub async fn posts_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.feed_id, p.url, p.title, p.description, p.published_at,
                   p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
