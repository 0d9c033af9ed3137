//! Per-user notification CRUD operations.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{NewNotification, Notification};

/// Create a notification for `notification.user_id`.
pub async fn create_notification(
    pool: &SqlitePool,
    notification: &NewNotification,
) -> Result<Notification> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, from_user_id, session_id, kind, message)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&notification.user_id)
    .bind(&notification.from_user_id)
    .bind(&notification.session_id)
    .bind(&notification.kind)
    .bind(&notification.message)
    .execute(pool)
    .await?;

    get_notification(pool, &notification.user_id, &id).await
}

/// Get one of a user's notifications.
pub async fn get_notification(pool: &SqlitePool, user_id: &str, id: &str) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, from_user_id, session_id, kind, message, is_read, created_at
        FROM notifications
        WHERE user_id = ? AND id = ?
        "#,
    )
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Notification",
        id: id.to_string(),
    })
}

/// Get all notifications for a user, newest first.
pub async fn list_notifications(pool: &SqlitePool, user_id: &str) -> Result<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, from_user_id, session_id, kind, message, is_read, created_at
        FROM notifications
        WHERE user_id = ?
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Mark a notification as read. Marking an already-read notification is a no-op.
pub async fn mark_read(pool: &SqlitePool, user_id: &str, id: &str) -> Result<Notification> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET is_read = 1
        WHERE user_id = ? AND id = ?
        "#,
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Notification",
            id: id.to_string(),
        });
    }

    get_notification(pool, user_id, id).await
}

/// Count unread notifications for a user.
pub async fn count_unread(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM notifications
        WHERE user_id = ? AND is_read = 0
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
