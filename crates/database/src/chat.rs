//! Direct chat CRUD operations.

use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::Chat;

/// Order-independent key for a pair of users.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

/// Find the direct chat between two users, if any.
pub async fn find_direct_chat(pool: &SqlitePool, a: &str, b: &str) -> Result<Option<Chat>> {
    let chat = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, kind, participants, tutor_posting_id, last_message, created_at, updated_at
        FROM chats
        WHERE kind = 'direct' AND pair_key = ?
        "#,
    )
    .bind(pair_key(a, b))
    .fetch_optional(pool)
    .await?;

    Ok(chat)
}

/// Get the direct chat between two users, creating it if needed.
///
/// Returns the chat and whether this call created it. The unique pair key
/// makes concurrent calls converge on the same row.
pub async fn find_or_create_direct_chat(
    pool: &SqlitePool,
    a: &str,
    b: &str,
    tutor_posting_id: Option<&str>,
) -> Result<(Chat, bool)> {
    let id = Uuid::new_v4().to_string();
    let participants = vec![a.to_string(), b.to_string()];

    let inserted = sqlx::query(
        r#"
        INSERT INTO chats (id, kind, pair_key, participants, tutor_posting_id)
        VALUES (?, 'direct', ?, ?, ?)
        ON CONFLICT(pair_key) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(pair_key(a, b))
    .bind(Json(&participants))
    .bind(tutor_posting_id)
    .execute(pool)
    .await?
    .rows_affected();

    let chat = find_direct_chat(pool, a, b)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Chat",
            id: pair_key(a, b),
        })?;

    Ok((chat, inserted == 1))
}

/// Get a chat by id.
pub async fn get_chat(pool: &SqlitePool, id: &str) -> Result<Chat> {
    sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, kind, participants, tutor_posting_id, last_message, created_at, updated_at
        FROM chats
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Chat",
        id: id.to_string(),
    })
}

/// List a user's chats, most recently active first.
pub async fn list_chats_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Chat>> {
    let chats = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, kind, participants, tutor_posting_id, last_message, created_at, updated_at
        FROM chats
        WHERE EXISTS (
            SELECT 1 FROM json_each(chats.participants) WHERE json_each.value = ?
        )
        ORDER BY updated_at DESC, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(chats)
}

/// Attach the posting a conversation is about.
pub async fn set_tutor_posting(pool: &SqlitePool, chat_id: &str, posting_id: &str) -> Result<Chat> {
    let result = sqlx::query(
        r#"
        UPDATE chats
        SET tutor_posting_id = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(posting_id)
    .bind(chat_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Chat",
            id: chat_id.to_string(),
        });
    }

    get_chat(pool, chat_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(pair_key("alice", "bob"), pair_key("bob", "alice"));
        assert_eq!(pair_key("alice", "bob"), "alice|bob");
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let db = test_db().await;

        let (first, created) = find_or_create_direct_chat(db.pool(), "alice", "bob", None)
            .await
            .unwrap();
        assert!(created);
        assert!(first.last_message.is_none());
        assert_eq!(first.participants.0, vec!["alice".to_string(), "bob".to_string()]);

        let (second, created) = find_or_create_direct_chat(db.pool(), "bob", "alice", None)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chats")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_list_chats_for_user() {
        let db = test_db().await;
        find_or_create_direct_chat(db.pool(), "alice", "bob", None).await.unwrap();
        find_or_create_direct_chat(db.pool(), "alice", "carol", None).await.unwrap();
        find_or_create_direct_chat(db.pool(), "bob", "carol", None).await.unwrap();

        assert_eq!(list_chats_for_user(db.pool(), "alice").await.unwrap().len(), 2);
        assert_eq!(list_chats_for_user(db.pool(), "carol").await.unwrap().len(), 2);
        assert!(list_chats_for_user(db.pool(), "dave").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_tutor_posting() {
        let db = test_db().await;
        let (chat, _) = find_or_create_direct_chat(db.pool(), "alice", "bob", None)
            .await
            .unwrap();

        let updated = set_tutor_posting(db.pool(), &chat.id, "posting-9").await.unwrap();
        assert_eq!(updated.tutor_posting_id.as_deref(), Some("posting-9"));

        let result = set_tutor_posting(db.pool(), "missing", "posting-9").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
