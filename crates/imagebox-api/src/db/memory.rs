//! In-process metadata store for local runs and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ImageRecord, MetadataStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    items: DashMap<String, ImageRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_item(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.items.get(image_id).map(|entry| entry.value().clone()))
    }

    async fn put_item(&self, record: &ImageRecord) -> Result<(), StoreError> {
        self.items.insert(record.image_id.clone(), record.clone());
        Ok(())
    }

    async fn scan(&self, limit: usize) -> Result<Vec<ImageRecord>, StoreError> {
        let mut records: Vec<ImageRecord> =
            self.items.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.image_id.cmp(&b.image_id))
        });
        records.truncate(limit);
        Ok(records)
    }
}
