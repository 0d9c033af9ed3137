//! Chat message CRUD operations.
//!
//! Every write that can change which message is newest also rewrites the
//! chat's `last_message` snapshot in the same transaction.

use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{LastMessage, Message};

/// Fields required to send a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub body: String,
    pub kind: String,
}

/// Append a message to a chat and update the chat's preview.
pub async fn insert_message(pool: &SqlitePool, message: &NewMessage) -> Result<Message> {
    let id = Uuid::new_v4().to_string();
    let read_by = vec![message.sender_id.clone()];
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO messages (id, chat_id, sender_id, body, kind, read_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&message.chat_id)
    .bind(&message.sender_id)
    .bind(&message.body)
    .bind(&message.kind)
    .bind(Json(&read_by))
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "Chat",
                    id: message.chat_id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    let stored = fetch_message(&mut *tx, &id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.clone(),
        })?;

    sqlx::query(
        r#"
        UPDATE chats
        SET last_message = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(Json(preview(&stored)))
    .bind(&stored.created_at)
    .bind(&stored.chat_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(stored)
}

/// Get a message by id.
pub async fn get_message(pool: &SqlitePool, id: &str) -> Result<Message> {
    let mut conn = pool.acquire().await?;
    fetch_message(&mut conn, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        })
}

/// List the newest `limit` messages of a chat, oldest first.
pub async fn list_messages(pool: &SqlitePool, chat_id: &str, limit: i64) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, sender_id, body, kind, read_by, edited, edited_at, created_at
        FROM (
            SELECT rowid AS seq, id, chat_id, sender_id, body, kind, read_by,
                   edited, edited_at, created_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at DESC, seq DESC
            LIMIT ?
        )
        ORDER BY created_at, seq
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Add `user_id` to the read receipts of each message.
///
/// Already-read messages and unknown ids are skipped. Returns the number of
/// messages that gained a receipt.
pub async fn mark_read(pool: &SqlitePool, message_ids: &[String], user_id: &str) -> Result<u64> {
    if message_ids.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut marked = 0;

    for id in message_ids {
        marked += sqlx::query(
            r#"
            UPDATE messages
            SET read_by = json_insert(read_by, '$[#]', ?1)
            WHERE id = ?2
              AND NOT EXISTS (
                  SELECT 1 FROM json_each(messages.read_by) WHERE json_each.value = ?1
              )
            "#,
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    Ok(marked)
}

/// Replace a message body, flagging it as edited.
pub async fn edit_message(pool: &SqlitePool, id: &str, body: &str) -> Result<Message> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE messages
        SET body = ?, edited = 1, edited_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(body)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        });
    }

    let stored = fetch_message(&mut *tx, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        })?;

    // Keep the preview in step when the newest message is edited.
    sqlx::query(
        r#"
        UPDATE chats
        SET last_message = json_set(last_message, '$.body', ?)
        WHERE id = ? AND json_extract(last_message, '$.id') = ?
        "#,
    )
    .bind(&stored.body)
    .bind(&stored.chat_id)
    .bind(&stored.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(stored)
}

/// Delete a message and recompute its chat's preview.
///
/// Returns the deleted message.
pub async fn delete_message(pool: &SqlitePool, id: &str) -> Result<Message> {
    let mut tx = pool.begin().await?;

    let deleted = fetch_message(&mut *tx, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Message",
            id: id.to_string(),
        })?;

    sqlx::query("DELETE FROM messages WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let newest = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, sender_id, body, kind, read_by, edited, edited_at, created_at
        FROM messages
        WHERE chat_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(&deleted.chat_id)
    .fetch_optional(&mut *tx)
    .await?;

    sqlx::query("UPDATE chats SET last_message = ? WHERE id = ?")
        .bind(newest.as_ref().map(|m| Json(preview(m))))
        .bind(&deleted.chat_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(deleted)
}

fn preview(message: &Message) -> LastMessage {
    LastMessage {
        id: message.id.clone(),
        sender_id: message.sender_id.clone(),
        body: message.body.clone(),
        created_at: message.created_at.clone(),
    }
}

async fn fetch_message(conn: &mut SqliteConnection, id: &str) -> Result<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, sender_id, body, kind, read_by, edited, edited_at, created_at
        FROM messages
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(message)
}
