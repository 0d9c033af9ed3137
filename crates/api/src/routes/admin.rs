//! Maintenance endpoints for an external scheduler.

use axum::extract::State;
use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::response::{ApiResponse, Updated};
use crate::state::AppState;

/// Complete every session whose slot has ended.
pub async fn sweep_sessions(State(state): State<AppState>) -> Result<ApiResponse<Updated>> {
    let updated = state.sessions.sweep_expired_sessions(Utc::now()).await?;
    info!(updated, "Swept expired sessions");
    Ok(ApiResponse::ok(Updated { updated }))
}
