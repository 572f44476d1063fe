use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Load or generate attempted with zero Online workers
    #[error("no workers available")]
    NoWorkersAvailable,

    /// Generate attempted before any successful load
    #[error("model not loaded")]
    ModelNotLoaded,

    /// A specific worker rejected or failed its layer-load instruction.
    /// The load aborts here; earlier workers keep whatever they loaded.
    #[error("worker {worker} failed to load layers: {reason}")]
    WorkerLoadFailed { worker: String, reason: String },

    /// The chained generate call errored or timed out. Only the first hop is
    /// directly observed, so no specific worker can be blamed.
    #[error("pipeline generation failed: {0}")]
    PipelineFailed(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

/// Convert ApiError into HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoWorkersAvailable | ApiError::ModelNotLoaded => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::WorkerLoadFailed { .. } | ApiError::PipelineFailed(_) => {
                tracing::error!(error = %self, "Pipeline operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers and services
pub type ApiResult<T> = Result<T, ApiError>;
