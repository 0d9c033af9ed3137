//! Tutor posting endpoints.

use axum::extract::{Path, State};
use database::{NewPosting, PostingFilter, PostingSort, TutorPosting};
use marketplace::{profiles, suggest_tutors, Candidate};
use serde::Deserialize;

use crate::error::{ApiError, AppJson, AppQuery, Result};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub course: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub include_booked: bool,
    pub sort: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<PostingFilter> {
        let sort = match self.sort.as_deref() {
            None | Some("") => PostingSort::default(),
            Some(raw) => PostingSort::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown sort: {raw}")))?,
        };

        Ok(PostingFilter {
            course: self.course.filter(|c| !c.trim().is_empty()),
            location: self.location.filter(|l| !l.trim().is_empty()),
            include_booked: self.include_booked,
            exclude_tutor: None,
            sort,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub student_id: String,
}

pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<ApiResponse<Vec<TutorPosting>>> {
    let filter = query.into_filter()?;
    Ok(ApiResponse::ok(profiles::list_postings(&state.db, &filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AppJson(posting): AppJson<NewPosting>,
) -> Result<ApiResponse<TutorPosting>> {
    let created = profiles::create_posting(&state.db, &posting).await?;
    Ok(ApiResponse::created(created))
}

pub async fn get_posting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<TutorPosting>> {
    Ok(ApiResponse::ok(profiles::get_posting(&state.db, &id).await?))
}

/// Best-matching open postings for a student.
pub async fn suggested(
    State(state): State<AppState>,
    AppJson(req): AppJson<SuggestRequest>,
) -> Result<ApiResponse<Vec<Candidate>>> {
    let candidates = suggest_tutors(
        &state.db,
        state.scorer.as_ref(),
        &req.student_id,
        state.suggested_limit,
    )
    .await?;
    Ok(ApiResponse::ok(candidates))
}
