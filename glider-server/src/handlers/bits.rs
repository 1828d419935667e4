use std::io;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use futures::{StreamExt, TryStreamExt};
use glider_core::{BitsPayload, DrainingStream};
use glider_model::BuildRecord;
use tracing::debug;

use super::parse_build_id;
use crate::infra::{app_state::AppState, errors::AppResult};

/// Streams the request body to the executor. Completes only once the
/// executor has read all of it.
pub async fn upload_bits(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> AppResult<(StatusCode, Json<BuildRecord>)> {
    let id = parse_build_id(&id)?;
    // Resolve before delegating so unknown ids never reach the executor.
    state.coordinator().get(&id)?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let stream = body.into_data_stream().map_err(io::Error::other).boxed();

    let record = state
        .coordinator()
        .upload_bits(&id, BitsPayload::new(content_type, stream))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Executor side: waits briefly for an upload and streams it back out.
pub async fn fetch_bits(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_build_id(&id)?;
    let handoff = state.coordinator().fetch_bits(&id).await?;
    debug!(build_id = %id, "bits picked up");

    let content_type = handoff
        .item
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok());
    let mut response =
        Body::from_stream(DrainingStream::new(handoff)).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}
