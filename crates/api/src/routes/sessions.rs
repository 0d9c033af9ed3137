//! Booking endpoints. Paths are scoped to the caller's uid.

use axum::extract::{Path, State};
use chrono::Utc;
use database::SessionEntry;
use marketplace::{NewSessionRequest, SessionStatus};
use serde::Deserialize;

use crate::error::{ApiError, AppJson, Result};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_proof: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: f64,
}

pub async fn list(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<ApiResponse<Vec<SessionEntry>>> {
    Ok(ApiResponse::ok(state.sessions.list_sessions(&uid).await?))
}

/// Book a tutor as `uid`.
pub async fn create(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    AppJson(req): AppJson<NewSessionRequest>,
) -> Result<ApiResponse<SessionEntry>> {
    let entry = state.sessions.create_session(&uid, req).await?;
    Ok(ApiResponse::created(entry))
}

/// Fetch one session, completing it first if its slot has passed.
pub async fn get_session(
    State(state): State<AppState>,
    Path((uid, session_id)): Path<(String, String)>,
) -> Result<ApiResponse<SessionEntry>> {
    let entry = state
        .sessions
        .get_session_with_expiration_check(&uid, &session_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(entry))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path((uid, session_id)): Path<(String, String)>,
    AppJson(req): AppJson<StatusRequest>,
) -> Result<ApiResponse<SessionEntry>> {
    let status = SessionStatus::from_str(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status: {}", req.status)))?;

    let entry = state
        .sessions
        .update_status(&uid, &session_id, status)
        .await?;
    Ok(ApiResponse::ok(entry))
}

pub async fn submit_payment(
    State(state): State<AppState>,
    Path((uid, session_id)): Path<(String, String)>,
    AppJson(req): AppJson<PaymentRequest>,
) -> Result<ApiResponse<SessionEntry>> {
    let entry = state
        .sessions
        .update_payment_proof(&uid, &session_id, &req.payment_proof)
        .await?;
    Ok(ApiResponse::ok(entry))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Path((uid, session_id)): Path<(String, String)>,
    AppJson(req): AppJson<ReviewRequest>,
) -> Result<ApiResponse<SessionEntry>> {
    let entry = state
        .sessions
        .submit_review(&uid, &session_id, req.rating)
        .await?;
    Ok(ApiResponse::ok(entry))
}
