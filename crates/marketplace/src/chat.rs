//! Direct chats and their messages.

use database::message::{self as messages, NewMessage};
use database::validation::{validate_text, MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
use database::{chat as chats, tutor, Chat, Database, Message};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{MarketplaceError, Result};

/// Messages returned when the client does not ask for a page size.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: i64 = 200;

/// A message as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Chat rules on top of the database.
#[derive(Debug, Clone)]
pub struct Chats {
    db: Database,
}

impl Chats {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the direct chat between two users, creating it on first contact.
    pub async fn find_or_create_chat(
        &self,
        user_id: &str,
        other_user_id: &str,
        tutor_posting_id: Option<&str>,
    ) -> Result<Chat> {
        validate_text("userId", user_id, MAX_TITLE_LENGTH)?;
        validate_text("otherUserId", other_user_id, MAX_TITLE_LENGTH)?;
        if user_id == other_user_id {
            return Err(MarketplaceError::Validation(
                "cannot start a chat with yourself".to_string(),
            ));
        }

        if let Some(posting_id) = tutor_posting_id {
            tutor::get_posting(self.db.pool(), posting_id).await?;
        }

        let (chat, created) = chats::find_or_create_direct_chat(
            self.db.pool(),
            user_id,
            other_user_id,
            tutor_posting_id,
        )
        .await?;

        if created {
            info!(chat_id = %chat.id, "Started chat");
            return Ok(chat);
        }

        // An existing chat picks up the posting the first time one is given.
        match tutor_posting_id {
            Some(posting_id) if chat.tutor_posting_id.is_none() => {
                Ok(chats::set_tutor_posting(self.db.pool(), &chat.id, posting_id).await?)
            }
            _ => Ok(chat),
        }
    }

    /// A user's chats, most recently active first.
    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>> {
        Ok(chats::list_chats_for_user(self.db.pool(), user_id).await?)
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        Ok(chats::get_chat(self.db.pool(), chat_id).await?)
    }

    /// Link a chat to the posting it is about.
    pub async fn attach_tutor_posting(&self, chat_id: &str, posting_id: &str) -> Result<Chat> {
        tutor::get_posting(self.db.pool(), posting_id).await?;
        Ok(chats::set_tutor_posting(self.db.pool(), chat_id, posting_id).await?)
    }

    /// Send a message. Only participants may write to a chat.
    pub async fn send_message(&self, request: SendMessageRequest) -> Result<Message> {
        validate_text("body", &request.body, MAX_BODY_LENGTH)?;

        let chat = self.get_chat(&request.chat_id).await?;
        if !chat.has_participant(&request.sender_id) {
            return Err(MarketplaceError::Forbidden(
                "only participants can write to this chat".to_string(),
            ));
        }

        let kind = request
            .kind
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| "text".to_string());

        let message = messages::insert_message(
            self.db.pool(),
            &NewMessage {
                chat_id: request.chat_id,
                sender_id: request.sender_id,
                body: request.body,
                kind,
            },
        )
        .await?;

        debug!(chat_id = %message.chat_id, message_id = %message.id, "Message sent");
        Ok(message)
    }

    /// The newest `limit` messages of a chat, oldest first.
    pub async fn list_messages(&self, chat_id: &str, limit: Option<i64>) -> Result<Vec<Message>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self.get_chat(chat_id).await?;
        Ok(messages::list_messages(self.db.pool(), chat_id, limit).await?)
    }

    /// Record that `user_id` has read the given messages.
    ///
    /// Returns how many messages gained a receipt; repeating the call is a no-op.
    pub async fn mark_read(&self, message_ids: &[String], user_id: &str) -> Result<u64> {
        validate_text("userId", user_id, MAX_TITLE_LENGTH)?;
        Ok(messages::mark_read(self.db.pool(), message_ids, user_id).await?)
    }

    /// Edit a message. Only its sender may do this.
    pub async fn edit_message(&self, message_id: &str, user_id: &str, body: &str) -> Result<Message> {
        validate_text("body", body, MAX_BODY_LENGTH)?;
        self.authorize_sender(message_id, user_id).await?;
        Ok(messages::edit_message(self.db.pool(), message_id, body).await?)
    }

    /// Delete a message. Only its sender may do this.
    pub async fn delete_message(&self, message_id: &str, user_id: &str) -> Result<Message> {
        self.authorize_sender(message_id, user_id).await?;
        Ok(messages::delete_message(self.db.pool(), message_id).await?)
    }

    async fn authorize_sender(&self, message_id: &str, user_id: &str) -> Result<()> {
        let message = messages::get_message(self.db.pool(), message_id).await?;
        if message.sender_id != user_id {
            return Err(MarketplaceError::Forbidden(
                "only the sender can change a message".to_string(),
            ));
        }
        Ok(())
    }
}
