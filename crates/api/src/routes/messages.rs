//! Message endpoints.

use axum::extract::{Path, State};
use database::Message;
use marketplace::SendMessageRequest;
use serde::Deserialize;

use crate::error::{AppJson, AppQuery, Result};
use crate::response::{ApiResponse, Removed, Updated};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub chat_id: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub message_ids: Vec<String>,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub user_id: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderQuery {
    pub user_id: String,
}

/// The newest page of a chat, oldest first.
pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<ApiResponse<Vec<Message>>> {
    let messages = state
        .chats
        .list_messages(&query.chat_id, query.limit)
        .await?;
    Ok(ApiResponse::ok(messages))
}

pub async fn send(
    State(state): State<AppState>,
    AppJson(req): AppJson<SendMessageRequest>,
) -> Result<ApiResponse<Message>> {
    Ok(ApiResponse::created(state.chats.send_message(req).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AppJson(req): AppJson<ReadRequest>,
) -> Result<ApiResponse<Updated>> {
    let updated = state
        .chats
        .mark_read(&req.message_ids, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(Updated { updated }))
}

pub async fn edit(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    AppJson(req): AppJson<EditRequest>,
) -> Result<ApiResponse<Message>> {
    let message = state
        .chats
        .edit_message(&message_id, &req.user_id, &req.body)
        .await?;
    Ok(ApiResponse::ok(message))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    AppQuery(query): AppQuery<SenderQuery>,
) -> Result<ApiResponse<Removed>> {
    let removed = state
        .chats
        .delete_message(&message_id, &query.user_id)
        .await?;
    Ok(ApiResponse::ok(Removed { id: removed.id }))
}
