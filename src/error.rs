//! Error types for Waypoint
//!
//! Every error is logged and rendered as a plain-text body equal to its
//! message, with the matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed JSON body, missing required proxy parameter, bad directive
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Not Found")]
    NotFound,

    /// Non-success status from the upstream, relayed verbatim
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// Could not reach the upstream
    #[error("Bad Gateway: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => *status,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::NotFound => "not_found",
            AppError::Upstream { .. } => "upstream",
            AppError::Network(_) => "network",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = %status.as_u16(), kind = self.kind(), error = %message, "Request failed");
        } else {
            warn!(status = %status.as_u16(), kind = self.kind(), error = %message, "Request rejected");
        }

        (status, message).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
