//! Chat endpoints.

use axum::extract::{Path, State};
use database::Chat;
use serde::Deserialize;

use crate::error::{AppJson, AppQuery, Result};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    pub user_id: String,
    pub other_user_id: String,
    #[serde(default)]
    pub tutor_posting_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachPostingRequest {
    pub tutor_posting_id: String,
}

pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserQuery>,
) -> Result<ApiResponse<Vec<Chat>>> {
    Ok(ApiResponse::ok(state.chats.list_chats(&query.user_id).await?))
}

/// Open the chat between two users, creating it on first contact.
pub async fn find_or_create(
    State(state): State<AppState>,
    AppJson(req): AppJson<StartChatRequest>,
) -> Result<ApiResponse<Chat>> {
    let chat = state
        .chats
        .find_or_create_chat(
            &req.user_id,
            &req.other_user_id,
            req.tutor_posting_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(chat))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<ApiResponse<Chat>> {
    Ok(ApiResponse::ok(state.chats.get_chat(&chat_id).await?))
}

pub async fn attach_tutor_posting(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    AppJson(req): AppJson<AttachPostingRequest>,
) -> Result<ApiResponse<Chat>> {
    let chat = state
        .chats
        .attach_tutor_posting(&chat_id, &req.tutor_posting_id)
        .await?;
    Ok(ApiResponse::ok(chat))
}
