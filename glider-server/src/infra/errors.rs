use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use glider_core::{CoordinatorError, RegistryError};
use glider_model::ModelError;
use serde_json::json;
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => Self::not_found(err.to_string()),
            RegistryError::Validation(_) => Self::bad_request(err.to_string()),
            RegistryError::SessionAlreadySet(_)
            | RegistryError::AlreadyCompleted(_)
            | RegistryError::AlreadyDelegated(_) => {
                Self::conflict(err.to_string())
            }
        }
    }
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Registry(err) => err.into(),
            CoordinatorError::Validation(_) => Self::bad_request(err.to_string()),
            CoordinatorError::ExecutorRejected { .. } => {
                Self::service_unavailable(err.to_string())
            }
            CoordinatorError::ExecutorUnreachable(_)
            | CoordinatorError::BitsInterrupted => {
                Self::bad_gateway(err.to_string())
            }
            CoordinatorError::BitsNotFetched
            | CoordinatorError::BitsTimedOut => Self::not_found(err.to_string()),
            CoordinatorError::NoSessionEndpoint(_) => {
                Self::internal(err.to_string())
            }
            CoordinatorError::Internal(msg) => {
                tracing::error!(error = %msg, "internal coordinator failure");
                Self::internal(msg)
            }
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Malformed or mistyped JSON bodies are client errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glider_model::BuildId;

    #[test]
    fn coordinator_errors_map_to_statuses() {
        let cases = [
            (
                CoordinatorError::Registry(RegistryError::NotFound(
                    BuildId::new(),
                )),
                StatusCode::NOT_FOUND,
            ),
            (
                CoordinatorError::ExecutorRejected { status: 500 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CoordinatorError::ExecutorUnreachable("refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (CoordinatorError::BitsTimedOut, StatusCode::NOT_FOUND),
            (CoordinatorError::BitsNotFetched, StatusCode::NOT_FOUND),
            (
                CoordinatorError::Registry(RegistryError::AlreadyCompleted(
                    BuildId::new(),
                )),
                StatusCode::CONFLICT,
            ),
            (
                CoordinatorError::Registry(RegistryError::AlreadyDelegated(
                    BuildId::new(),
                )),
                StatusCode::CONFLICT,
            ),
            (
                CoordinatorError::NoSessionEndpoint("hijack"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoordinatorError::Validation(ModelError::MissingField("image")),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(AppError::from(err).status, expected, "{label}");
        }
    }
}
