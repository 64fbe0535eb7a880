//! Metadata record model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One uploaded image, as stored and as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_id: String,
    pub filename: String,
    pub content_type: String,
    pub s3_key: String,
    /// Payload size in bytes.
    pub size: i64,
    /// UTC, ISO-8601 with microseconds and no offset.
    pub uploaded_at: String,
    pub bucket: String,
}
