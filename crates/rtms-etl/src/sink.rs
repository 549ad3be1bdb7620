//! CSV serialization and object storage
//!
//! The table is rendered to UTF-8 CSV with a byte-order mark (so spreadsheet
//! tools pick up the Korean headers) and written as one object. Writes are
//! all-or-nothing: S3 `PutObject` is atomic and the local store renames a
//! fully written temporary file into place.

use crate::config::StorageConfig;
use crate::error::{EtlError, Result};
use crate::table::Table;
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use rtms_common::checksum::sha256_hex;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument};

/// UTF-8 byte-order mark written before the header row
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Destination for named objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` as the object `key`, replacing any previous object
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Human-readable location of `key`, for logs
    fn location(&self, key: &str) -> String;
}

/// Amazon S3 (or S3-compatible) bucket
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from explicit credentials, or from the default AWS
    /// provider chain when none are configured
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        debug!("Initializing storage with config: {:?}", config);

        let mut builder = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "rtms-etl-config");
                aws_sdk_s3::Config::builder()
                    .credentials_provider(credentials)
                    .region(Region::new(config.region.clone()))
                    .behavior_version(aws_config::BehaviorVersion::latest())
            },
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder.force_path_style(config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, region = %config.region, "Storage client initialized");

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, body), fields(bucket = %self.bucket, bytes = body.len()))]
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| EtlError::storage(key, format!("{}", DisplayErrorContext(&e))))?;

        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// Objects as files under a local directory
#[derive(Debug, Clone)]
pub struct LocalDirObjectStore {
    root: PathBuf,
}

impl LocalDirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Target path of `key`, refusing keys that would escape the root
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if key.is_empty() || escapes {
            return Err(EtlError::storage(
                key,
                "object key must be a relative path without '..' components",
            ));
        }
        Ok(self.path_for(key))
    }
}

#[async_trait]
impl ObjectStore for LocalDirObjectStore {
    #[instrument(skip(self, body, _content_type), fields(root = %self.root.display(), bytes = body.len()))]
    async fn put_object(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let target = self.resolve(key)?;
        let parent = target.parent().unwrap_or(Path::new(".")).to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| EtlError::storage(key, e))?;

        let file_name = target
            .file_name()
            .ok_or_else(|| EtlError::storage(key, "object key has no file name"))?;
        let mut staging_name = file_name.to_os_string();
        staging_name.push(".partial");
        let staging = parent.join(staging_name);

        let written = match tokio::fs::write(&staging, &body).await {
            Ok(()) => tokio::fs::rename(&staging, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                debug!(staging = %staging.display(), error = %cleanup, "Staging file not removed");
            }
            return Err(EtlError::storage(key, e));
        }

        Ok(())
    }

    fn location(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

/// What was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub key: String,
    pub location: String,
    pub size: usize,
    /// SHA-256 of the uploaded bytes
    pub checksum: String,
}

/// Serialize a table as BOM-prefixed UTF-8 CSV with a header row
pub fn encode_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(table.column_names())?;
    for row in 0..table.row_count() {
        if let Some(cells) = table.row(row) {
            writer.write_record(&cells)?;
        }
    }

    writer.into_inner().map_err(|e| EtlError::Io(e.into_error()))
}

/// Writes tables as CSV objects into an [`ObjectStore`]
pub struct CsvSink<S> {
    store: S,
}

impl<S: ObjectStore> CsvSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip(self, table), fields(rows = table.row_count()))]
    pub async fn upload(&self, table: &Table, object_name: &str) -> Result<UploadResult> {
        let body = encode_csv(table)?;
        let size = body.len();
        let checksum = sha256_hex(&body);
        let location = self.store.location(object_name);

        debug!("Uploading {} bytes to {}", size, location);
        self.store.put_object(object_name, body, CSV_CONTENT_TYPE).await?;
        info!(%location, size, %checksum, "Uploaded CSV object");

        Ok(UploadResult {
            key: object_name.to_string(),
            location,
            size,
            checksum,
        })
    }
}
