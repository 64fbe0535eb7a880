//! Lambda proxy integration.
//!
//! Events are converted to HTTP requests and driven through the same axum
//! router the HTTP server uses, so both deployments share every handler.

mod event;
mod runtime;

pub use event::{ProxyEvent, ProxyResponse};
pub use runtime::{run, Invocation, RuntimeClient, RuntimeError};

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Router,
};
use imagebox_multipart::DecodeError;
use thiserror::Error;
use tower::ServiceExt;

use crate::error::ApiError;

/// Errors converting between proxy events and HTTP messages.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error(transparent)]
    InvalidBody(#[from] DecodeError),

    #[error("cannot build request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("cannot read response body: {0}")]
    Body(String),
}

/// Handle one proxy event in-process.
///
/// An event that cannot be turned into an HTTP request is answered with a
/// 400 JSON error, the same shape the router produces.
pub async fn handle_event(router: &Router, event: ProxyEvent) -> Result<ProxyResponse, EventError> {
    let method = event.http_method.clone();
    let path = event.path.clone();

    let response = match event.to_request() {
        Ok(request) => match router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        },
        Err(e) => rejected_event(&e).into_response(),
    };
    let proxy = ProxyResponse::from_response(response).await?;

    imagebox_telemetry::log_invocation_completed!(
        method = %method,
        path = %path,
        status = proxy.status_code,
        "invocation completed"
    );
    Ok(proxy)
}

/// Error response for an event the router never sees.
fn rejected_event(err: &EventError) -> impl IntoResponse {
    let error = match err {
        EventError::InvalidBody(_) => "Invalid request body",
        _ => "Invalid request",
    };
    (
        [(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )],
        ApiError::rejected(StatusCode::BAD_REQUEST, error, err.to_string()),
    )
}
