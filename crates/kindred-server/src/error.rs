use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use kindred_core::CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("missing or invalid token")]
    Unauthorized,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Core(core) => match core {
                CoreError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, serde_json::json!({ "error": core.to_string() }))
                }
                CoreError::ReservedUsername
                | CoreError::DuplicateRequest
                | CoreError::RequestClosed
                | CoreError::DuplicateOrigin
                | CoreError::DuplicateReporter => {
                    (StatusCode::CONFLICT, serde_json::json!({ "error": core.to_string() }))
                }
                CoreError::Forbidden(_) => {
                    (StatusCode::FORBIDDEN, serde_json::json!({ "error": core.to_string() }))
                }
                CoreError::NotFound | CoreError::NoMatch => {
                    (StatusCode::NOT_FOUND, serde_json::json!({ "error": core.to_string() }))
                }
                // The ban gate surfaces its expiry so clients can display it.
                CoreError::Banned { until } => (
                    StatusCode::FORBIDDEN,
                    serde_json::json!({
                        "error": "banned",
                        "banned_until": until.to_rfc3339(),
                    }),
                ),
                CoreError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": core.to_string() }))
                }
                CoreError::Credential(_) | CoreError::Store(_) => {
                    tracing::error!(error = %core, "internal failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        serde_json::json!({ "error": "internal server error" }),
                    )
                }
            },
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": self.to_string() }))
            }
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": self.to_string() }))
            }
            ApiError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, serde_json::json!({ "error": self.to_string() }))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
