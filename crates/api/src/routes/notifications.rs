//! Notification endpoints.

use axum::extract::{Path, State};
use database::{NewNotification, Notification};
use marketplace::profiles;
use serde::{Deserialize, Serialize};

use crate::error::{AppJson, Result};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub from_user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<ApiResponse<Vec<Notification>>> {
    Ok(ApiResponse::ok(profiles::list_notifications(&state.db, &uid).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<ApiResponse<UnreadCount>> {
    let unread = profiles::count_unread_notifications(&state.db, &uid).await?;
    Ok(ApiResponse::ok(UnreadCount { unread }))
}

/// Notify `uid`.
pub async fn create(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    AppJson(req): AppJson<NotifyRequest>,
) -> Result<ApiResponse<Notification>> {
    let notification = profiles::create_notification(
        &state.db,
        &NewNotification {
            user_id: uid,
            from_user_id: req.from_user_id,
            session_id: req.session_id,
            kind: req.kind,
            message: req.message,
        },
    )
    .await?;
    Ok(ApiResponse::created(notification))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path((uid, notification_id)): Path<(String, String)>,
) -> Result<ApiResponse<Notification>> {
    let notification = profiles::mark_notification_read(&state.db, &uid, &notification_id).await?;
    Ok(ApiResponse::ok(notification))
}
