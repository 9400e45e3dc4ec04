use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use spark_db::StoreError;

/// Error surface of the action interface. Soft outcomes (duplicate swipe,
/// unreachable recipient) are response payloads, not variants here.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid session. Always surfaced, never silently retried.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The caller acted on a match they do not participate in. Logged as a
    /// potential integrity violation.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    /// Unexpected persistence or internal failure. The operation had no
    /// partial effect; the body stays opaque.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::NotParticipant => ApiError::Forbidden,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".to_string()),
            ApiError::Forbidden => {
                warn!("forbidden action attempted");
                (StatusCode::FORBIDDEN, "forbidden".to_string())
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(e) => {
                error!("internal error: {e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
