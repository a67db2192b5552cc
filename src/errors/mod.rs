//! Error handling module for the content backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::calendar::CalendarError;
use crate::fetcher::FetchError;
use crate::store::StoreError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const UPSTREAM_READ_ERROR: &str = "UPSTREAM_READ_ERROR";
    pub const UPSTREAM_WRITE_ERROR: &str = "UPSTREAM_WRITE_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const UPSTREAM_TIMEOUT: &str = "UPSTREAM_TIMEOUT";
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    pub const UNPROCESSABLE: &str = "UNPROCESSABLE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// The upstream step an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStep {
    /// Reading the current version token
    Read,
    /// Conditional write of the new content
    Write,
}

impl UpstreamStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamStep::Read => "read",
            UpstreamStep::Write => "write",
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Required server configuration is missing
    Configuration(String),
    /// Shared secret missing or wrong
    Unauthorized(String),
    /// Endpoint does not accept this method
    MethodNotAllowed,
    /// Resource not found
    NotFound(String),
    /// Request body failed schema validation
    Validation(String),
    /// Request body could not be parsed
    BadRequest(String),
    /// Fetching the current version token failed; nothing was written
    UpstreamRead {
        status: Option<u16>,
        detail: String,
    },
    /// The store rejected the conditional write
    UpstreamWrite {
        status: Option<u16>,
        detail: String,
    },
    /// The version token went stale between read and write
    Conflict { detail: String },
    /// An upstream call exceeded its time budget
    Timeout { step: UpstreamStep, after: Duration },
    /// Both the primary and mirror content sources failed
    Fetch(String),
    /// Stored content exists but cannot be turned into the requested output
    Unprocessable(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => codes::CONFIGURATION_ERROR,
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::MethodNotAllowed => codes::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::UpstreamRead { .. } => codes::UPSTREAM_READ_ERROR,
            AppError::UpstreamWrite { .. } => codes::UPSTREAM_WRITE_ERROR,
            AppError::Conflict { .. } => codes::CONFLICT,
            AppError::Timeout { .. } => codes::UPSTREAM_TIMEOUT,
            AppError::Fetch(_) => codes::FETCH_ERROR,
            AppError::Unprocessable(_) => codes::UNPROCESSABLE,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Short human message shown to the editor.
    pub fn message(&self) -> String {
        match self {
            AppError::Configuration(_) => "Server is not configured for saving".to_string(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::UpstreamRead { .. } => {
                "Failed to read current content version".to_string()
            }
            AppError::UpstreamWrite { .. } => "Failed to save content".to_string(),
            AppError::Conflict { .. } => {
                "Content was changed by someone else; reload and retry".to_string()
            }
            AppError::Timeout { step, after } => format!(
                "Content store did not answer the {} request within {:?}",
                step.as_str(),
                after
            ),
            AppError::Fetch(_) => "Failed to load content. Please try again later.".to_string(),
            AppError::Unprocessable(msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Detail string carried alongside the message, if any.
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::Configuration(detail) | AppError::Fetch(detail) | AppError::Internal(detail) => {
                Some(detail.clone())
            }
            AppError::UpstreamRead { status, detail } | AppError::UpstreamWrite { status, detail } => {
                Some(match status {
                    Some(code) => format!("{} (status {})", detail, code),
                    None => detail.clone(),
                })
            }
            AppError::Conflict { detail } => Some(detail.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.details() {
            Some(details) => write!(f, "{}: {} ({})", self.error_code(), self.message(), details),
            None => write!(f, "{}: {}", self.error_code(), self.message()),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Classify a store failure by the step it happened in.
    ///
    /// A stale token is only meaningful for the write, so a conflict reported
    /// during the read is still a read failure.
    pub fn from_store(step: UpstreamStep, err: StoreError) -> Self {
        tracing::error!("Content store {} failed: {}", step.as_str(), err);
        let status = err.status();
        match (step, err) {
            (UpstreamStep::Write, StoreError::Conflict { detail }) => AppError::Conflict { detail },
            (UpstreamStep::Read, err) => AppError::UpstreamRead {
                status,
                detail: err.to_string(),
            },
            (UpstreamStep::Write, StoreError::Rejected { body, .. }) => AppError::UpstreamWrite {
                status,
                detail: body,
            },
            (UpstreamStep::Write, err) => AppError::UpstreamWrite {
                status,
                detail: err.to_string(),
            },
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        tracing::error!("Fetch error: {}", err);
        AppError::Fetch(err.to_string())
    }
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        AppError::Unprocessable(err.to_string())
    }
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            code: error.error_code().to_string(),
            error: error.message(),
            details: error.details(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::Configuration("GITHUB_TOKEN".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Unauthorized("nope".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::Conflict {
                detail: "sha mismatch".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Timeout {
                step: UpstreamStep::Read,
                after: Duration::from_secs(10)
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_upstream_details_include_status() {
        let err = AppError::UpstreamWrite {
            status: Some(422),
            detail: "{\"message\":\"Invalid request\"}".into(),
        };
        let details = err.details().unwrap();
        assert!(details.contains("422"));
        assert!(details.contains("Invalid request"));
    }

    #[test]
    fn test_store_conflict_on_write_maps_to_conflict() {
        let err = AppError::from_store(
            UpstreamStep::Write,
            StoreError::Conflict {
                detail: "does not match".into(),
            },
        );
        assert_eq!(err.error_code(), codes::CONFLICT);
    }

    #[test]
    fn test_store_failure_on_read_names_read_step() {
        let err = AppError::from_store(
            UpstreamStep::Read,
            StoreError::NotFound {
                path: "src/data/resources.json".into(),
            },
        );
        assert_eq!(err.error_code(), codes::UPSTREAM_READ_ERROR);
        assert!(err.details().unwrap().contains("404"));
    }

    #[test]
    fn test_store_rejection_maps_to_write_error() {
        let err = AppError::from_store(
            UpstreamStep::Write,
            StoreError::Rejected {
                status: 422,
                body: "bad".into(),
            },
        );
        assert_eq!(err.error_code(), codes::UPSTREAM_WRITE_ERROR);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.details().unwrap(), "bad (status 422)");
    }

    #[test]
    fn test_error_response_envelope() {
        let body = ErrorResponse::new(&AppError::Unauthorized("Unauthorized".into()));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["error"], "Unauthorized");
        assert!(json.get("details").is_none());
    }
}
