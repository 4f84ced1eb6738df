use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use scriptdeck_core::binder::BindError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce the `{"error": "<message>"}`
/// JSON bodies the client expects. Validation failures are reported
/// before any process is spawned, so they carry no partial side effects.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The requested file name is not in the discovered script set.
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// Parameter validation failed against the script's contract.
    #[error(transparent)]
    Validation(#[from] BindError),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ScriptNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
