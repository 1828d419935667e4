use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Method, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use glider_core::RelayRequest;

use super::parse_build_id;
use crate::infra::{app_state::AppState, errors::AppResult};

/// Relays the caller's request to the executor's abort endpoint and answers
/// with whatever the executor returned.
pub async fn abort_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let id = parse_build_id(&id)?;
    let request = RelayRequest {
        method,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    };

    let relayed = state.coordinator().abort(&id, request).await?;

    let mut response =
        (relayed.status, Body::from(relayed.body)).into_response();
    if let Some(content_type) = relayed
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}
