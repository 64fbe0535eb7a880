//! Image metadata store.

mod memory;
mod models;
mod postgres;

pub use memory::MemoryMetadataStore;
pub use models::ImageRecord;
pub use postgres::{create_pool, PgMetadataStore};

use async_trait::async_trait;
use thiserror::Error;

/// Metadata store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Table names are interpolated into SQL, so they must be plain identifiers.
    #[error("invalid table name '{0}'")]
    InvalidTable(String),
}

/// Key-value table of image metadata, keyed by image ID.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch one record.
    async fn get_item(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError>;

    /// Insert or replace a record.
    async fn put_item(&self, record: &ImageRecord) -> Result<(), StoreError>;

    /// Return up to `limit` records, most recent upload first.
    async fn scan(&self, limit: usize) -> Result<Vec<ImageRecord>, StoreError>;

    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
