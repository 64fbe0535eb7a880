//! S3 URL addressing and download-link presigning.

use std::time::Duration;

use chrono::Utc;
use imagebox_sigv4 as sigv4;

use super::StorageError;

/// Where a bucket's objects are reachable.
///
/// - **Virtual-hosted** (default): `https://{bucket}.s3.{region}.amazonaws.com/{key}`
/// - **Path-style**: `https://s3.{region}.amazonaws.com/{bucket}/{key}`
/// - **Custom endpoint** (always path-style): `{endpoint}/{bucket}/{key}`
#[derive(Debug, Clone)]
pub struct S3Endpoint {
    pub region: String,
    /// S3-compatible endpoint such as `http://localhost:9000`.
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

/// A resolved object address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    /// Value of the `host` header.
    pub host: String,
    /// Percent-encoded path, as signed.
    pub canonical_uri: String,
    /// Full URL without a query string.
    pub url: String,
}

impl S3Endpoint {
    pub fn resolve(&self, bucket: &str, key: &str) -> Result<ObjectUrl, StorageError> {
        let key = key.trim_start_matches('/');

        let (host, origin, prefix, path) = match &self.endpoint {
            Some(ep) => {
                let parsed = reqwest::Url::parse(ep)
                    .map_err(|e| StorageError::InvalidEndpoint(format!("{}: {}", ep, e)))?;
                let name = parsed
                    .host_str()
                    .ok_or_else(|| StorageError::InvalidEndpoint(format!("{}: no host", ep)))?;
                let host = match parsed.port() {
                    Some(port) => format!("{}:{}", name, port),
                    None => name.to_string(),
                };
                // The URL parser has already percent-encoded the prefix.
                let prefix = parsed.path().trim_end_matches('/').to_string();
                let origin = format!("{}://{}", parsed.scheme(), host);
                (host, origin, prefix, format!("/{}/{}", bucket, key))
            }
            None if self.force_path_style => {
                let host = format!("s3.{}.amazonaws.com", self.region);
                let origin = format!("https://{}", host);
                (host, origin, String::new(), format!("/{}/{}", bucket, key))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                let origin = format!("https://{}", host);
                (host, origin, String::new(), format!("/{}", key))
            }
        };

        let canonical_uri = format!("{}{}", prefix, sigv4::canonical_uri(&path));
        Ok(ObjectUrl {
            url: format!("{}{}", origin, canonical_uri),
            host,
            canonical_uri,
        })
    }
}

/// Produces SigV4 query-signed `GET` links.
#[derive(Debug, Clone)]
pub struct Presigner {
    endpoint: S3Endpoint,
    credentials: sigv4::Credentials,
}

impl Presigner {
    pub fn new(endpoint: S3Endpoint, credentials: sigv4::Credentials) -> Self {
        Self {
            endpoint,
            credentials,
        }
    }

    pub fn endpoint(&self) -> &S3Endpoint {
        &self.endpoint
    }

    pub fn credentials(&self) -> &sigv4::Credentials {
        &self.credentials
    }

    pub fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if key.is_empty() {
            return Err(StorageError::Presign("empty object key".into()));
        }
        if expires_in.as_secs() == 0 {
            return Err(StorageError::Presign("expiry must be at least one second".into()));
        }

        let target = self.endpoint.resolve(bucket, key)?;
        let query = sigv4::presign(
            &sigv4::PresignInput {
                method: "GET",
                host: &target.host,
                canonical_uri: &target.canonical_uri,
                timestamp: Utc::now(),
                expires_in: expires_in.as_secs(),
            },
            &self.credentials,
            &sigv4::SigningConfig {
                region: &self.endpoint.region,
                service: "s3",
            },
        );

        Ok(format!("{}?{}", target.url, query))
    }
}
