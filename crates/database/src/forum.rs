//! Forum posts, comments and upvotes.
//!
//! Upvotes are presence rows in `upvotes`; each target also carries a
//! denormalized `upvote_count`. Both are only ever changed together inside one
//! transaction, so the counter always equals the number of presence rows.

use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{Comment, ForumPost, UpvoteStatus};

/// Fields required to create a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub course: Option<String>,
}

/// Fields required to create a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub author_id: String,
    pub content: String,
}

/// Something that can be upvoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpvoteTarget {
    Post(String),
    Comment { post_id: String, comment_id: String },
}

impl UpvoteTarget {
    fn kind(&self) -> &'static str {
        match self {
            UpvoteTarget::Post(_) => "post",
            UpvoteTarget::Comment { .. } => "comment",
        }
    }

    fn target_id(&self) -> &str {
        match self {
            UpvoteTarget::Post(id) => id,
            UpvoteTarget::Comment { comment_id, .. } => comment_id,
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            UpvoteTarget::Post(_) => "ForumPost",
            UpvoteTarget::Comment { .. } => "Comment",
        }
    }

    fn not_found(&self) -> DatabaseError {
        DatabaseError::NotFound {
            entity: self.entity(),
            id: self.target_id().to_string(),
        }
    }
}

/// Create a post.
pub async fn create_post(pool: &SqlitePool, post: &NewPost) -> Result<ForumPost> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO forum_posts (id, author_id, title, content, course)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&post.author_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.course)
    .execute(pool)
    .await?;

    get_post(pool, &id).await
}

/// Get a post by id.
pub async fn get_post(pool: &SqlitePool, id: &str) -> Result<ForumPost> {
    sqlx::query_as::<_, ForumPost>(
        r#"
        SELECT id, author_id, title, content, course, upvote_count, created_at
        FROM forum_posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "ForumPost",
        id: id.to_string(),
    })
}

/// List posts, newest first, optionally for a single course.
pub async fn list_posts(pool: &SqlitePool, course: Option<&str>) -> Result<Vec<ForumPost>> {
    let posts = sqlx::query_as::<_, ForumPost>(
        r#"
        SELECT id, author_id, title, content, course, upvote_count, created_at
        FROM forum_posts
        WHERE ?1 IS NULL OR course = ?1
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(course)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Add a comment to a post.
pub async fn create_comment(
    pool: &SqlitePool,
    post_id: &str,
    comment: &NewComment,
) -> Result<Comment> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO forum_comments (id, post_id, author_id, content)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(post_id)
    .bind(&comment.author_id)
    .bind(&comment.content)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "ForumPost",
                    id: post_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_comment(pool, post_id, &id).await
}

/// Get a comment on a post.
pub async fn get_comment(pool: &SqlitePool, post_id: &str, id: &str) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, author_id, content, upvote_count, created_at
        FROM forum_comments
        WHERE post_id = ? AND id = ?
        "#,
    )
    .bind(post_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Comment",
        id: id.to_string(),
    })
}

/// List a post's comments, oldest first.
pub async fn list_comments(pool: &SqlitePool, post_id: &str) -> Result<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, author_id, content, upvote_count, created_at
        FROM forum_comments
        WHERE post_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Flip `user_id`'s upvote on a target.
///
/// The presence row and the counter change in one transaction. The first
/// statement is a write, so concurrent toggles on the same database serialize.
pub async fn toggle_upvote(
    pool: &SqlitePool,
    target: &UpvoteTarget,
    user_id: &str,
) -> Result<UpvoteStatus> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query(
        r#"
        DELETE FROM upvotes
        WHERE target_kind = ? AND target_id = ? AND user_id = ?
        "#,
    )
    .bind(target.kind())
    .bind(target.target_id())
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let has_upvoted = removed == 0;
    let delta = if has_upvoted { 1 } else { -1 };

    if bump_counter(&mut *tx, target, delta).await? == 0 {
        return Err(target.not_found());
    }

    if has_upvoted {
        sqlx::query(
            r#"
            INSERT INTO upvotes (target_kind, target_id, user_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(target.kind())
        .bind(target.target_id())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    let upvote_count = read_counter(&mut *tx, target)
        .await?
        .ok_or_else(|| target.not_found())?;

    tx.commit().await?;

    Ok(UpvoteStatus {
        upvote_count,
        has_upvoted,
    })
}

/// Read a target's counter and whether `user_id` has upvoted it.
pub async fn upvote_status(
    pool: &SqlitePool,
    target: &UpvoteTarget,
    user_id: &str,
) -> Result<UpvoteStatus> {
    let mut conn = pool.acquire().await?;

    let upvote_count = read_counter(&mut *conn, target)
        .await?
        .ok_or_else(|| target.not_found())?;

    let has_upvoted = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM upvotes
        WHERE target_kind = ? AND target_id = ? AND user_id = ?
        "#,
    )
    .bind(target.kind())
    .bind(target.target_id())
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .is_some();

    Ok(UpvoteStatus {
        upvote_count,
        has_upvoted,
    })
}

async fn bump_counter(conn: &mut SqliteConnection, target: &UpvoteTarget, delta: i64) -> Result<u64> {
    let result = match target {
        UpvoteTarget::Post(id) => {
            sqlx::query("UPDATE forum_posts SET upvote_count = upvote_count + ? WHERE id = ?")
                .bind(delta)
                .bind(id)
                .execute(&mut *conn)
                .await?
        }
        UpvoteTarget::Comment {
            post_id,
            comment_id,
        } => {
            sqlx::query(
                "UPDATE forum_comments SET upvote_count = upvote_count + ? WHERE id = ? AND post_id = ?",
            )
            .bind(delta)
            .bind(comment_id)
            .bind(post_id)
            .execute(&mut *conn)
            .await?
        }
    };

    Ok(result.rows_affected())
}

async fn read_counter(conn: &mut SqliteConnection, target: &UpvoteTarget) -> Result<Option<i64>> {
    let count = match target {
        UpvoteTarget::Post(id) => {
            sqlx::query_scalar::<_, i64>("SELECT upvote_count FROM forum_posts WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
        }
        UpvoteTarget::Comment {
            post_id,
            comment_id,
        } => {
            sqlx::query_scalar::<_, i64>(
                "SELECT upvote_count FROM forum_comments WHERE id = ? AND post_id = ?",
            )
            .bind(comment_id)
            .bind(post_id)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    Ok(count)
}

/// Delete a post with all of its comments and their upvote rows.
///
/// Returns the number of comments removed.
pub async fn delete_post_cascade(pool: &SqlitePool, post_id: &str) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM upvotes
        WHERE (target_kind = 'comment'
               AND target_id IN (SELECT id FROM forum_comments WHERE post_id = ?1))
           OR (target_kind = 'post' AND target_id = ?1)
        "#,
    )
    .bind(post_id)
    .execute(&mut *tx)
    .await?;

    let comments = sqlx::query("DELETE FROM forum_comments WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let posts = sqlx::query("DELETE FROM forum_posts WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if posts == 0 {
        return Err(DatabaseError::NotFound {
            entity: "ForumPost",
            id: post_id.to_string(),
        });
    }

    tx.commit().await?;

    tracing::info!(post_id, comments, "Deleted forum post");
    Ok(comments)
}

/// Delete a single comment and its upvote rows.
pub async fn delete_comment(pool: &SqlitePool, post_id: &str, comment_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM upvotes WHERE target_kind = 'comment' AND target_id = ?")
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM forum_comments WHERE post_id = ? AND id = ?")
        .bind(post_id)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Comment",
            id: comment_id.to_string(),
        });
    }

    tx.commit().await?;
    Ok(())
}
