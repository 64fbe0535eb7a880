//! Service configuration from flags and environment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, ValueEnum};

use crate::api::AppState;
use crate::db::{create_pool, MemoryMetadataStore, MetadataStore, PgMetadataStore};
use crate::storage::{MemoryObjectStore, ObjectStore, Presigner, S3Endpoint, S3ObjectStore};

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Credentials used to sign links when no AWS credentials are configured.
const LOCAL_ACCESS_KEY: &str = "imagebox-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Memory,
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetadataBackend {
    Memory,
    Postgres,
}

/// Settings shared by every way of running the service.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Bucket that receives uploads.
    #[arg(long = "bucket", env = "BUCKET_NAME")]
    pub bucket: String,

    /// Metadata table name.
    #[arg(long = "table", env = "TABLE_NAME", default_value = "images")]
    pub table: String,

    /// Object storage backend.
    #[arg(long, env = "IMAGEBOX_STORAGE", value_enum, default_value_t = StorageBackend::Memory)]
    pub storage: StorageBackend,

    /// Metadata backend.
    #[arg(long, env = "IMAGEBOX_METADATA", value_enum, default_value_t = MetadataBackend::Memory)]
    pub metadata: MetadataBackend,

    /// PostgreSQL database URL (postgres metadata backend).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Create the metadata table on startup.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub migrate: bool,

    /// AWS region of the bucket.
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3-compatible endpoint (MinIO, LocalStack, ...).
    #[arg(long, env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Address buckets in the path rather than the host name.
    #[arg(long)]
    pub force_path_style: bool,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Lifetime of generated download links, in seconds.
    #[arg(long, env = "URL_EXPIRY_SECS", default_value_t = 3600)]
    pub url_expiry_secs: u64,

    /// Timeout for object storage requests, in seconds.
    #[arg(long, default_value_t = 30)]
    pub storage_timeout_secs: u64,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl AppConfig {
    fn credentials(&self) -> anyhow::Result<imagebox_sigv4::Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(imagebox_sigv4::Credentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: self.session_token.clone(),
            }),
            _ if self.storage == StorageBackend::S3 => anyhow::bail!(
                "S3 storage requires AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
            ),
            _ => Ok(imagebox_sigv4::Credentials {
                access_key_id: LOCAL_ACCESS_KEY.to_string(),
                secret_access_key: LOCAL_ACCESS_KEY.to_string(),
                session_token: None,
            }),
        }
    }

    fn presigner(&self) -> anyhow::Result<Presigner> {
        Ok(Presigner::new(
            S3Endpoint {
                region: self.region.clone(),
                endpoint: self.endpoint.clone(),
                force_path_style: self.force_path_style,
            },
            self.credentials()?,
        ))
    }

    /// Construct the collaborators and the shared handler state.
    pub async fn build_state(&self) -> anyhow::Result<AppState> {
        let presigner = self.presigner()?;

        let objects: Arc<dyn ObjectStore> = match self.storage {
            StorageBackend::Memory => Arc::new(MemoryObjectStore::new(&self.bucket, presigner)),
            StorageBackend::S3 => Arc::new(
                S3ObjectStore::new(
                    &self.bucket,
                    presigner,
                    Duration::from_secs(self.storage_timeout_secs),
                )
                .context("failed to build S3 client")?,
            ),
        };

        let metadata: Arc<dyn MetadataStore> = match self.metadata {
            MetadataBackend::Memory => Arc::new(MemoryMetadataStore::new()),
            MetadataBackend::Postgres => {
                let url = self
                    .database_url
                    .as_deref()
                    .context("postgres metadata requires DATABASE_URL")?;
                let pool = create_pool(url)
                    .await
                    .context("failed to connect to database")?;
                let store = PgMetadataStore::new(pool, &self.table)?;
                if self.migrate {
                    store
                        .ensure_table()
                        .await
                        .context("failed to create metadata table")?;
                }
                Arc::new(store)
            }
        };

        Ok(AppState {
            objects,
            metadata,
            url_expiry: Duration::from_secs(self.url_expiry_secs),
        })
    }
}
