// ABOUTME: Error taxonomy for the gateway's HTTP and WebSocket paths
// Every variant renders as a human-readable message; internal detail stays in the logs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::runtime::ContainerError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Container is not running: {0}")]
    NotRunning(String),

    #[error("API key required")]
    Unauthorized,

    #[error("Invalid API key")]
    Forbidden,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Failed to start terminal: {0}")]
    AttachFailure(String),

    #[error("Terminal stream failed: {0}")]
    StreamFailure(String),

    #[error("Container runtime error")]
    Runtime(#[from] ContainerError),

    #[error("Internal server error")]
    Internal(String),
}

impl GatewayError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::NotRunning(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::AttachFailure(_) => StatusCode::BAD_GATEWAY,
            Self::StreamFailure(_) | Self::Runtime(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}
