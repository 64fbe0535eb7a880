//! PostgreSQL-backed metadata store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{ImageRecord, MetadataStore, StoreError};

const COLUMNS: &str = "image_id, filename, content_type, s3_key, size, uploaded_at, bucket";

/// Create a connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Metadata table in PostgreSQL.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
    table: String,
}

impl PgMetadataStore {
    /// Create a store over `table`, which must be a plain SQL identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        if !is_identifier(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Create the table and its listing index if they do not exist.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                image_id     TEXT PRIMARY KEY,
                filename     TEXT NOT NULL,
                content_type TEXT NOT NULL,
                s3_key       TEXT NOT NULL,
                size         BIGINT NOT NULL,
                uploaded_at  TEXT NOT NULL,
                bucket       TEXT NOT NULL
            )
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_uploaded_at_idx ON {table} (uploaded_at DESC)",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn get_item(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {COLUMNS} FROM {} WHERE image_id = $1",
            self.table
        ))
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn put_item(&self, record: &ImageRecord) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (image_id) DO UPDATE SET
                filename = EXCLUDED.filename,
                content_type = EXCLUDED.content_type,
                s3_key = EXCLUDED.s3_key,
                size = EXCLUDED.size,
                uploaded_at = EXCLUDED.uploaded_at,
                bucket = EXCLUDED.bucket
            "#,
            self.table
        ))
        .bind(&record.image_id)
        .bind(&record.filename)
        .bind(&record.content_type)
        .bind(&record.s3_key)
        .bind(record.size)
        .bind(&record.uploaded_at)
        .bind(&record.bucket)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn scan(&self, limit: usize) -> Result<Vec<ImageRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {COLUMNS} FROM {} ORDER BY uploaded_at DESC, image_id LIMIT $1",
            self.table
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63
}
