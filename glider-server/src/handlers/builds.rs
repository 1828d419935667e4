use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use glider_model::{BuildRecord, BuildSubmission};

use super::parse_build_id;
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn create_build(
    State(state): State<AppState>,
    payload: Result<Json<BuildSubmission>, JsonRejection>,
) -> AppResult<(StatusCode, Json<BuildRecord>)> {
    let Json(submission) = payload?;
    let record = state.coordinator().create(submission)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_builds(
    State(state): State<AppState>,
) -> Json<Vec<BuildRecord>> {
    Json(state.coordinator().list())
}

pub async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BuildRecord>> {
    let id = parse_build_id(&id)?;
    Ok(Json(state.coordinator().get(&id)?))
}
