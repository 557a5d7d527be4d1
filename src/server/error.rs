// src/server/error.rs

//! Mapping of crate errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

use crate::errors::LaunchwatchError;

/// Error returned by every handler. The body is always `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Core(LaunchwatchError),
    /// Malformed request that never reached the orchestrator.
    BadRequest(String),
    /// Route parameter that cannot name any resource.
    NotFound(String),
}

impl ApiError {
    /// - Validation / concurrency / malformed request: 400
    /// - Unknown or unparseable pid: 404
    /// - Everything else: 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Core(LaunchwatchError::ValidationError(_))
            | Self::Core(LaunchwatchError::ConcurrencyError)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(LaunchwatchError::ProcessNotFound(_)) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Core(e) => e.to_string(),
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
        }
    }
}

impl From<LaunchwatchError> for ApiError {
    fn from(e: LaunchwatchError) -> Self {
        Self::Core(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::from(LaunchwatchError::ValidationError("0".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LaunchwatchError::ConcurrencyError).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LaunchwatchError::ProcessNotFound(7)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LaunchwatchError::gateway("kill failed")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::BadRequest("bad body".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("Process not found: abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn messages_come_from_the_error() {
        assert_eq!(
            ApiError::from(LaunchwatchError::ConcurrencyError).message(),
            "Launch already in progress"
        );
        assert_eq!(
            ApiError::from(LaunchwatchError::ProcessNotFound(42)).message(),
            "Process not found: 42"
        );
    }
}
