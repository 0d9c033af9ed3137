//! Profile endpoints.

use axum::extract::{Path, State};
use database::{NewUser, Onboarding, UserProfile};
use marketplace::profiles;
use serde::Deserialize;

use crate::error::{AppJson, Result};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteRequest {
    pub uid: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub uid: String,
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrRequest {
    pub uid: String,
    pub payment_qr: String,
}

#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    pub uid: String,
    #[serde(flatten)]
    pub answers: Onboarding,
}

/// Register the profile of a newly signed-in user.
pub async fn register(
    State(state): State<AppState>,
    AppJson(new_user): AppJson<NewUser>,
) -> Result<ApiResponse<UserProfile>> {
    let profile = profiles::create_user(&state.db, &new_user).await?;
    Ok(ApiResponse::created(profile))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(profiles::get_user(&state.db, &uid).await?))
}

pub async fn list_favourites(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::ok(profiles::list_favourites(&state.db, &uid).await?))
}

/// Toggle a favourite posting; responds with the resulting favourites.
pub async fn update_favourite(
    State(state): State<AppState>,
    AppJson(req): AppJson<FavouriteRequest>,
) -> Result<ApiResponse<Vec<String>>> {
    let favourites = profiles::toggle_favourite(&state.db, &req.uid, &req.session_id).await?;
    Ok(ApiResponse::ok(favourites))
}

pub async fn update_rating(
    State(state): State<AppState>,
    AppJson(req): AppJson<RatingRequest>,
) -> Result<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(
        profiles::apply_rating(&state.db, &req.uid, req.rating).await?,
    ))
}

pub async fn update_qr(
    State(state): State<AppState>,
    AppJson(req): AppJson<QrRequest>,
) -> Result<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(
        profiles::update_payment_qr(&state.db, &req.uid, &req.payment_qr).await?,
    ))
}

pub async fn onboard(
    State(state): State<AppState>,
    AppJson(req): AppJson<OnboardRequest>,
) -> Result<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(
        profiles::onboard(&state.db, &req.uid, &req.answers).await?,
    ))
}
