use super::schema::Database;
use super::types::DatabaseError;

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Follow a feed for a user. Returns false if the follow already existed.
    pub async fn create_follow(&self, user_id: i64, feed_id: i64) -> Result<bool, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, feed_id) DO NOTHING
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a follow. Returns false if the user was not following the feed.
    pub async fn delete_follow(&self, user_id: i64, feed_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Names of the feeds a user follows, in follow order.
    pub async fn follows_for_user(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT f.name
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY ff.id ASC
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_follow_and_list() {
        let db = test_db().await;
        let user = db.create_user("ana").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();

        assert!(db.create_follow(user.id, feed.id).await.unwrap());
        assert_eq!(db.follows_for_user(user.id).await.unwrap(), ["Blog"]);
    }

    #[tokio::test]
    async fn test_follow_twice_is_a_no_op() {
        let db = test_db().await;
        let user = db.create_user("ana").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();

        assert!(db.create_follow(user.id, feed.id).await.unwrap());
        assert!(!db.create_follow(user.id, feed.id).await.unwrap());
        assert_eq!(db.follows_for_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unfollow() {
        let db = test_db().await;
        let user = db.create_user("ana").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();

        db.create_follow(user.id, feed.id).await.unwrap();
        assert!(db.delete_follow(user.id, feed.id).await.unwrap());
        assert!(!db.delete_follow(user.id, feed.id).await.unwrap());
        assert!(db.follows_for_user(user.id).await.unwrap().is_empty());
    }
}
