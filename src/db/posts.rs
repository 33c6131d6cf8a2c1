//! Post repository: posts and their comments.

use super::DbError;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A post row. Comments are posts with a parent.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub parent_post_id: Option<Uuid>,
    pub content: String,
    pub created_at: i64,
}

/// A top-level post as shown in the feed.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: i64,
    pub author: String,
    pub comment_count: i64,
}

/// A comment with its author's name.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: Uuid,
    pub parent_post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: i64,
    pub author: String,
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    /// Create a new post repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a post (or a comment, when `parent_post_id` is set).
    pub async fn create(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_post_id: Option<Uuid>,
    ) -> Result<PostRecord, DbError> {
        let now = chrono::Utc::now().timestamp();
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO posts (id, group_id, user_id, parent_post_id, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(group_id)
        .bind(user_id)
        .bind(parent_post_id)
        .bind(content)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(PostRecord {
            id,
            group_id,
            user_id,
            parent_post_id,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, DbError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, Uuid, Option<Uuid>, String, i64)>(
            r#"
            SELECT id, group_id, user_id, parent_post_id, content, created_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(id, group_id, user_id, parent_post_id, content, created_at)| PostRecord {
                id,
                group_id,
                user_id,
                parent_post_id,
                content,
                created_at,
            },
        ))
    }

    /// Delete a post. Its comments cascade.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Top-level posts for a group feed, newest first, with author names
    /// and comment counts.
    pub async fn feed(
        &self,
        group_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PostSummary>, DbError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, i64, String, i64)>(
            r#"
            SELECT p.id, p.group_id, p.user_id, p.content, p.created_at, u.username,
                   (SELECT COUNT(*) FROM posts c WHERE c.parent_post_id = p.id)
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.group_id = ? AND p.parent_post_id IS NULL
            ORDER BY p.created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(group_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, group_id, user_id, content, created_at, author, comment_count)| {
                    PostSummary {
                        id,
                        group_id,
                        user_id,
                        content,
                        created_at,
                        author,
                        comment_count,
                    }
                },
            )
            .collect())
    }

    /// Comments on a post, oldest first.
    pub async fn comments_for(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, DbError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, i64, String)>(
            r#"
            SELECT p.id, p.parent_post_id, p.user_id, p.content, p.created_at, u.username
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.parent_post_id = ?
            ORDER BY p.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, parent_post_id, user_id, content, created_at, author)| CommentRecord {
                    id,
                    parent_post_id,
                    user_id,
                    content,
                    created_at,
                    author,
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::groups::roles::Role;

    #[tokio::test]
    async fn test_feed_counts_comments() {
        let db = Database::new(":memory:").await.unwrap();
        let user = db
            .users()
            .register("alice", "alice@example.com", "pw-test-123")
            .await
            .unwrap();
        let group = db
            .groups()
            .create("g", None, Some(user.id), "INVDDD444")
            .await
            .unwrap();
        db.members()
            .add(user.id, group.id, Role::Admin)
            .await
            .unwrap();

        let post = db
            .posts()
            .create(group.id, user.id, "first post", None)
            .await
            .unwrap();
        db.posts()
            .create(group.id, user.id, "a comment", Some(post.id))
            .await
            .unwrap();

        let feed = db.posts().feed(group.id, 10, 0).await.unwrap();
        assert_eq!(feed.len(), 1); // comments are not feed entries
        assert_eq!(feed[0].comment_count, 1);
        assert_eq!(feed[0].author, "alice");

        let comments = db.posts().comments_for(post.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "a comment");
    }
}
