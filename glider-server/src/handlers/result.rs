use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use glider_model::BuildResult;

use super::parse_build_id;
use crate::infra::{app_state::AppState, errors::AppResult};

/// Executor callback carrying the terminal status. Closes the build log.
pub async fn put_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BuildResult>, JsonRejection>,
) -> AppResult<Json<BuildResult>> {
    let id = parse_build_id(&id)?;
    // Unknown builds answer 404 even when the body is also bad.
    state.coordinator().get(&id)?;
    let Json(result) = payload?;
    Ok(Json(state.coordinator().record_result(&id, result)?))
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BuildResult>> {
    let id = parse_build_id(&id)?;
    Ok(Json(state.coordinator().result(&id)?))
}
