//! API error type and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chunkyard_protocol::ErrorResponse;
use chunkyard_protocol::constants::error_codes;
use chunkyard_transfer::TransferError;

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => error_codes::BAD_REQUEST,
            Self::Internal(_) => error_codes::INTERNAL,
            Self::Transfer(e) => match e {
                TransferError::SessionNotFound(_) => error_codes::NOT_FOUND,
                TransferError::SessionExpired(_) => error_codes::EXPIRED,
                TransferError::OffsetConflict { .. } => error_codes::OFFSET_CONFLICT,
                TransferError::InvalidName(_) => error_codes::BAD_REQUEST,
                TransferError::Storage { .. }
                | TransferError::Initialization { .. }
                | TransferError::InvalidTtl(_) => error_codes::INTERNAL,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transfer(e) => match e {
                TransferError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                TransferError::SessionExpired(_) => StatusCode::GONE,
                TransferError::OffsetConflict { .. } => StatusCode::CONFLICT,
                TransferError::InvalidName(_) => StatusCode::BAD_REQUEST,
                TransferError::Storage { .. }
                | TransferError::Initialization { .. }
                | TransferError::InvalidTtl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Filesystem details stay in the log.
        let body = if status.is_server_error() {
            tracing::error!("request failed: {self}");
            ErrorResponse::new(self.code(), "internal server error")
        } else {
            ErrorResponse::new(self.code(), self.to_string())
        };

        let body = match &self {
            Self::Transfer(TransferError::OffsetConflict { id, offset }) => {
                body.with_position(id.clone(), *offset)
            }
            _ => body,
        };

        (status, Json(body)).into_response()
    }
}
