//! Lambda Runtime API client and event loop.

use std::time::Duration;

use axum::Router;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use super::{handle_event, ProxyEvent};

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";

/// Runtime API errors. Any of these ends the loop.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("runtime API returned {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("next invocation has no request id")]
    MissingRequestId,
}

/// One pending invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub payload: Bytes,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

/// HTTP client for the Lambda Runtime API.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    base_url: String,
    http: reqwest::Client,
}

impl RuntimeClient {
    /// `api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(api: &str) -> Self {
        Self {
            base_url: format!("http://{}/{}/runtime", api, API_VERSION),
            // `next` long-polls, so no request timeout.
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Block until the next event is available.
    pub async fn next(&self) -> Result<Invocation, RuntimeError> {
        let endpoint = format!("{}/invocation/next", self.base_url);
        let response = self.http.get(&endpoint).send().await?;
        let response = check(endpoint, response)?;

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(RuntimeError::MissingRequestId)?;
        let payload = response.bytes().await?;

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    /// Report a successful result.
    pub async fn respond<T: Serialize>(&self, request_id: &str, body: &T) -> Result<(), RuntimeError> {
        let endpoint = format!("{}/invocation/{}/response", self.base_url, request_id);
        let response = self.http.post(&endpoint).json(body).send().await?;
        check(endpoint, response)?;
        Ok(())
    }

    /// Report a failed invocation.
    pub async fn fail(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeError> {
        let endpoint = format!("{}/invocation/{}/error", self.base_url, request_id);
        let response = self
            .http
            .post(&endpoint)
            .json(&ErrorReport {
                error_message: message,
                error_type,
            })
            .send()
            .await?;
        check(endpoint, response)?;
        Ok(())
    }
}

fn check(endpoint: String, response: reqwest::Response) -> Result<reqwest::Response, RuntimeError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RuntimeError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}

/// Poll for events and answer each one through `router`.
///
/// Runs until the Runtime API fails, or after `max_invocations` events when
/// given.
pub async fn run(
    client: &RuntimeClient,
    router: &Router,
    max_invocations: Option<usize>,
) -> Result<(), RuntimeError> {
    let mut handled = 0usize;
    while max_invocations.is_none_or(|max| handled < max) {
        let invocation = client.next().await?;
        handled += 1;

        let event: ProxyEvent = match serde_json::from_slice(&invocation.payload) {
            Ok(event) => event,
            Err(e) => {
                imagebox_telemetry::log_invocation_failed!(
                    request_id = %invocation.request_id,
                    error = %e,
                    "undecodable event"
                );
                client
                    .fail(&invocation.request_id, "InvalidEvent", &e.to_string())
                    .await?;
                continue;
            }
        };

        match handle_event(router, event).await {
            Ok(response) => client.respond(&invocation.request_id, &response).await?,
            Err(e) => {
                imagebox_telemetry::log_invocation_failed!(
                    request_id = %invocation.request_id,
                    error = %e,
                    "event could not be handled"
                );
                client
                    .fail(&invocation.request_id, "ResponseError", &e.to_string())
                    .await?;
            }
        }
    }
    Ok(())
}
