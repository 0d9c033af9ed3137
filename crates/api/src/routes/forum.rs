//! Forum endpoints.

use axum::extract::{Path, State};
use database::{Comment, ForumPost, UpvoteStatus, UpvoteTarget};
use marketplace::NewPostRequest;
use serde::Deserialize;

use crate::error::{AppJson, AppQuery, Result};
use crate::response::{ApiResponse, Removed};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub course: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterQuery {
    pub requester_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub author_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteRequest {
    pub user_id: String,
}

pub async fn list_posts(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CourseQuery>,
) -> Result<ApiResponse<Vec<ForumPost>>> {
    Ok(ApiResponse::ok(
        state.forum.list_posts(query.course.as_deref()).await?,
    ))
}

pub async fn create_post(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewPostRequest>,
) -> Result<ApiResponse<ForumPost>> {
    Ok(ApiResponse::created(state.forum.create_post(req).await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<ForumPost>> {
    Ok(ApiResponse::ok(state.forum.get_post(&post_id).await?))
}

/// Delete a post with its comments and upvotes.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    AppQuery(query): AppQuery<RequesterQuery>,
) -> Result<ApiResponse<Removed>> {
    state
        .forum
        .delete_post(&post_id, &query.requester_id)
        .await?;
    Ok(ApiResponse::ok(Removed { id: post_id }))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<ApiResponse<Vec<Comment>>> {
    Ok(ApiResponse::ok(state.forum.list_comments(&post_id).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    AppJson(req): AppJson<CommentRequest>,
) -> Result<ApiResponse<Comment>> {
    let comment = state
        .forum
        .add_comment(&post_id, &req.author_id, &req.content)
        .await?;
    Ok(ApiResponse::created(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    AppQuery(query): AppQuery<RequesterQuery>,
) -> Result<ApiResponse<Removed>> {
    state
        .forum
        .delete_comment(&post_id, &comment_id, &query.requester_id)
        .await?;
    Ok(ApiResponse::ok(Removed { id: comment_id }))
}

pub async fn upvote_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    AppJson(req): AppJson<UpvoteRequest>,
) -> Result<ApiResponse<UpvoteStatus>> {
    let target = UpvoteTarget::Post(post_id);
    Ok(ApiResponse::ok(
        state.forum.toggle_upvote(&target, &req.user_id).await?,
    ))
}

pub async fn post_upvote_status(
    State(state): State<AppState>,
    Path((post_id, user_id)): Path<(String, String)>,
) -> Result<ApiResponse<UpvoteStatus>> {
    let target = UpvoteTarget::Post(post_id);
    Ok(ApiResponse::ok(
        state.forum.upvote_status(&target, &user_id).await?,
    ))
}

pub async fn upvote_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    AppJson(req): AppJson<UpvoteRequest>,
) -> Result<ApiResponse<UpvoteStatus>> {
    let target = UpvoteTarget::Comment {
        post_id,
        comment_id,
    };
    Ok(ApiResponse::ok(
        state.forum.toggle_upvote(&target, &req.user_id).await?,
    ))
}

pub async fn comment_upvote_status(
    State(state): State<AppState>,
    Path((post_id, comment_id, user_id)): Path<(String, String, String)>,
) -> Result<ApiResponse<UpvoteStatus>> {
    let target = UpvoteTarget::Comment {
        post_id,
        comment_id,
    };
    Ok(ApiResponse::ok(
        state.forum.upvote_status(&target, &user_id).await?,
    ))
}
