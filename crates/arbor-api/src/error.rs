use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level failures, each mapped to one HTTP status.
///
/// Every failure is terminal for its request; nothing here is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// Duplicate username on signup. Surfaced as 400 like validation failures.
    #[error("{0}")]
    Conflict(String),

    /// One message for both unknown-user and wrong-password, so the response
    /// never reveals whether a username exists.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Missing, unknown, or expired session.
    #[error("Not logged in")]
    Session,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(m) | ApiError::Conflict(m) => {
                (StatusCode::BAD_REQUEST, m.clone())
            }
            ApiError::InvalidCredentials | ApiError::Session => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Internal(e) => {
                // Detail stays server-side; the client gets a generic body.
                error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
