//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;
use crate::storage::StorageError;

/// Error body returned by every handler: `{"error": ..., "message": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Create a 400 Bad Request error.
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            message: None,
        }
    }

    /// Create a 404 Not Found error.
    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
            message: None,
        }
    }

    /// Create a 500 Internal Server Error carrying the underlying message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Internal server error".into(),
            message: Some(message.into()),
        }
    }

    /// Create a 405 Method Not Allowed error.
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            error: "Method not allowed".into(),
            message: None,
        }
    }

    /// Wrap an axum extractor rejection, keeping its status and detail.
    pub fn rejected(status: StatusCode, error: impl Into<String>, detail: String) -> Self {
        Self {
            status,
            error: error.into(),
            message: Some(detail),
        }
    }

    /// Create a 503 Service Unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            error: "Service unavailable".into(),
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            imagebox_telemetry::log_validation_failure!(
                status = self.status.as_u16(),
                error = %self.error,
                "request rejected"
            );
        }
        (self.status, Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        imagebox_telemetry::log_storage_error!(error = %err, "object storage call failed");
        Self::internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        imagebox_telemetry::log_storage_error!(error = %err, "metadata store call failed");
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_body_has_only_error() {
        let err = ApiError::not_found("Image not found");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"error": "Image not found"})
        );
    }

    #[test]
    fn internal_error_surfaces_message() {
        let err = ApiError::internal("bucket unreachable");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"error": "Internal server error", "message": "bucket unreachable"})
        );
    }

    #[test]
    fn rejection_keeps_status_and_detail() {
        let err = ApiError::rejected(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large",
            "length limit exceeded".into(),
        );
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"error": "Request body too large", "message": "length limit exceeded"})
        );
    }

    #[test]
    fn response_is_json() {
        let resp = ApiError::bad_request("nope").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
