use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promobench_common::ErrorResponse;
use thiserror::Error;

/// Failures surfaced by handlers, the store and the benchmark harness.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("iterations must be between 1 and {max}, got {got}")]
    InvalidIterations { got: i64, max: u32 },

    #[error("{field} must be between 1 and {max}, got {got}")]
    InvalidCount { field: &'static str, got: i64, max: u32 },

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Legacy average latency is zero; improvement is undefined")]
    DegenerateBaseline,

    #[error("Server error: Store lock acquisition timed out")]
    LockTimeout,

    #[error("Server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidIterations { .. }
            | ServerError::InvalidCount { .. }
            | ServerError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ServerError::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Database(_) | ServerError::DegenerateBaseline | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(err: rusqlite::Error) -> Self {
        ServerError::Database(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        error_response(status, self.to_string())
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}
