//! S3 (or S3-compatible) object storage over signed HTTP requests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use imagebox_sigv4 as sigv4;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use super::{ObjectStore, Presigner, PutObject, StorageError};

/// Object storage client for a single bucket.
pub struct S3ObjectStore {
    client: reqwest::Client,
    bucket: String,
    presigner: Presigner,
}

impl S3ObjectStore {
    pub fn new(
        bucket: impl Into<String>,
        presigner: Presigner,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bucket: bucket.into(),
            presigner,
        })
    }

    /// Build the signed headers for a `PUT` of `object`.
    fn signed_put_headers(
        &self,
        host: &str,
        canonical_uri: &str,
        object: &PutObject,
    ) -> Result<HeaderMap, StorageError> {
        let body_sha256 = sigv4::sha256_hex(&object.body);
        let timestamp = Utc::now();
        let (datetime, _) = sigv4::amz_datetime(timestamp);
        let creds = self.presigner.credentials();

        // Keys must be lowercase; every x-amz-* header has to be signed.
        let mut headers_to_sign = BTreeMap::new();
        headers_to_sign.insert("host".to_string(), host.to_string());
        headers_to_sign.insert("content-type".to_string(), object.content_type.clone());
        headers_to_sign.insert("x-amz-content-sha256".to_string(), body_sha256.clone());
        headers_to_sign.insert("x-amz-date".to_string(), datetime);
        if let Some(token) = &creds.session_token {
            headers_to_sign.insert("x-amz-security-token".to_string(), token.clone());
        }
        for (name, value) in &object.metadata {
            headers_to_sign.insert(
                format!("x-amz-meta-{}", name.to_ascii_lowercase()),
                header_safe(value),
            );
        }

        let authorization = sigv4::sign(
            &sigv4::SigningInput {
                method: "PUT",
                canonical_uri,
                headers_to_sign: &headers_to_sign,
                body_sha256: &body_sha256,
                timestamp,
            },
            creds,
            &sigv4::SigningConfig {
                region: &self.presigner.endpoint().region,
                service: "s3",
            },
        );

        let mut headers = HeaderMap::new();
        for (name, value) in headers_to_sign.iter().filter(|(name, _)| *name != "host") {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }
        headers.insert(AUTHORIZATION, header_value("authorization", &authorization)?);
        Ok(headers)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, object: PutObject) -> Result<(), StorageError> {
        let target = self.presigner.endpoint().resolve(&self.bucket, &object.key)?;
        let headers = self.signed_put_headers(&target.host, &target.canonical_uri, &object)?;

        tracing::debug!(url = %target.url, size = object.body.len(), "PUT object");

        let response = self
            .client
            .put(&target.url)
            .headers(headers)
            .body(object.body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StorageError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        self.presigner.presign_get(&self.bucket, key, expires_in)
    }
}

/// Metadata values travel as HTTP headers: keep printable ASCII, escape the rest.
fn header_safe(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b' '..=b'~' if byte != b'%' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn header_name(name: &str) -> Result<HeaderName, StorageError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| StorageError::InvalidHeader(name.into()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, StorageError> {
    HeaderValue::from_str(value).map_err(|_| StorageError::InvalidHeader(name.into()))
}
