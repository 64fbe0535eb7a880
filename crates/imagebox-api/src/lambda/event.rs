//! API Gateway REST proxy event and response shapes.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, Response},
};
use http_body_util::BodyExt;
use imagebox_multipart::RawBody;
use serde::{Deserialize, Serialize};

use super::EventError;

/// Inbound proxy event (the subset the service reads).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub path_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// Outbound proxy response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ProxyEvent {
    /// Build the HTTP request the router will see.
    pub fn to_request(&self) -> Result<Request<Body>, EventError> {
        let method = Method::from_bytes(self.http_method.as_bytes())
            .map_err(|_| EventError::InvalidMethod(self.http_method.clone()))?;

        let body = match &self.body {
            Some(raw) => RawBody::decode(raw, self.is_base64_encoded)?.into_bytes(),
            None => Vec::new(),
        };

        let mut builder = Request::builder().method(method).uri(self.uri()?);
        for (name, value) in self.headers.iter().flatten() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| EventError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| EventError::InvalidHeader(name.to_string()))?;
            builder = builder.header(name, value);
        }

        Ok(builder.body(Body::from(body))?)
    }

    /// Path plus re-encoded query string.
    fn uri(&self) -> Result<String, EventError> {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        let mut url = reqwest::Url::parse("http://lambda.invalid")
            .and_then(|base| base.join(path))
            .map_err(|_| EventError::InvalidPath(self.path.clone()))?;

        if let Some(params) = self.query_string_parameters.as_ref().filter(|p| !p.is_empty()) {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        Ok(match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        })
    }
}

impl ProxyResponse {
    /// Collect a router response into the proxy shape.
    pub async fn from_response(response: Response<Body>) -> Result<Self, EventError> {
        let (parts, body) = response.into_parts();

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let bytes = body
            .collect()
            .await
            .map_err(|e| EventError::Body(e.to_string()))?
            .to_bytes();

        let (body, is_base64_encoded) = match String::from_utf8(bytes.to_vec()) {
            Ok(text) => (text, false),
            Err(_) => (base64_simd::STANDARD.encode_to_string(&bytes), true),
        };

        Ok(Self {
            status_code: parts.status.as_u16(),
            headers,
            body,
            is_base64_encoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> ProxyEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn deserializes_api_gateway_event() {
        let ev = event(json!({
            "httpMethod": "GET",
            "path": "/images",
            "headers": null,
            "queryStringParameters": {"limit": "2"},
            "pathParameters": null,
            "body": null,
            "isBase64Encoded": false,
            "requestContext": {"stage": "prod"}
        }));
        assert_eq!(ev.http_method, "GET");
        assert_eq!(ev.query_string_parameters.unwrap()["limit"], "2");
        assert!(ev.headers.is_none());
    }

    #[test]
    fn request_carries_query_and_headers() {
        let ev = event(json!({
            "httpMethod": "GET",
            "path": "/images",
            "headers": {"Accept": "application/json"},
            "queryStringParameters": {"limit": "2", "q": "a b"}
        }));
        let req = ev.to_request().unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.uri().path(), "/images");
        assert_eq!(req.uri().query(), Some("limit=2&q=a+b"));
        assert_eq!(req.headers()["accept"], "application/json");
    }

    #[tokio::test]
    async fn base64_body_is_decoded() {
        let ev = event(json!({
            "httpMethod": "POST",
            "path": "/upload",
            "body": "AAEC/w==",
            "isBase64Encoded": true
        }));
        let req = ev.to_request().unwrap();
        let bytes = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), &[0u8, 1, 2, 255]);
    }

    #[test]
    fn rejects_bad_base64_and_method() {
        let ev = event(json!({
            "httpMethod": "POST",
            "path": "/upload",
            "body": "not base64!",
            "isBase64Encoded": true
        }));
        assert!(matches!(ev.to_request(), Err(EventError::InvalidBody(_))));

        let ev = event(json!({"httpMethod": "GE T", "path": "/"}));
        assert!(matches!(ev.to_request(), Err(EventError::InvalidMethod(_))));
    }

    #[tokio::test]
    async fn response_body_is_text_when_utf8() {
        let response = Response::builder()
            .status(201)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"ok":true}"#))
            .unwrap();
        let proxy = ProxyResponse::from_response(response).await.unwrap();
        assert_eq!(proxy.status_code, 201);
        assert_eq!(proxy.body, r#"{"ok":true}"#);
        assert!(!proxy.is_base64_encoded);
        assert_eq!(proxy.headers["content-type"], "application/json");

        let wire = serde_json::to_value(&proxy).unwrap();
        assert_eq!(wire["statusCode"], 201);
        assert_eq!(wire["isBase64Encoded"], false);
    }

    #[tokio::test]
    async fn binary_response_body_is_base64() {
        let response = Response::builder()
            .body(Body::from(vec![0xffu8, 0xfe]))
            .unwrap();
        let proxy = ProxyResponse::from_response(response).await.unwrap();
        assert!(proxy.is_base64_encoded);
        assert_eq!(proxy.body, "//4=");
    }
}
