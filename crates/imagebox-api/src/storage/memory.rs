//! In-process object storage for local runs and tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ObjectStore, Presigner, PutObject, StorageError};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

/// Keeps objects in memory; links are presigned exactly as for S3 so they
/// have the same shape, though nothing serves them.
pub struct MemoryObjectStore {
    bucket: String,
    presigner: Presigner,
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>, presigner: Presigner) -> Self {
        Self {
            bucket: bucket.into(),
            presigner,
            objects: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, object: PutObject) -> Result<(), StorageError> {
        self.objects.insert(
            object.key,
            StoredObject {
                body: object.body,
                content_type: object.content_type,
                metadata: object.metadata,
            },
        );
        Ok(())
    }

    fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        self.presigner.presign_get(&self.bucket, key, expires_in)
    }
}
