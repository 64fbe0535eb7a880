//! Object storage for image payloads.

mod memory;
mod presign;
mod s3;

pub use memory::MemoryObjectStore;
pub use presign::{Presigner, S3Endpoint};
pub use s3::S3ObjectStore;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request to object storage failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("object storage returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid header value for '{0}'")]
    InvalidHeader(String),

    #[error("invalid storage endpoint {0}")]
    InvalidEndpoint(String),

    #[error("cannot presign URL: {0}")]
    Presign(String),
}

/// An object to upload.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    /// User metadata, stored as `x-amz-meta-{name}`.
    pub metadata: BTreeMap<String, String>,
}

/// Bucket-scoped object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket every key lives in.
    fn bucket(&self) -> &str;

    /// Store an object, replacing any existing one under the same key.
    async fn put_object(&self, object: PutObject) -> Result<(), StorageError>;

    /// Generate a time-bounded `GET` link for `key`.
    fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;
}
