use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use s3::{creds::Credentials, error::S3Error, Bucket, BucketConfiguration, Region};
use thiserror::Error;
use tracing::{error, info};

use crate::config::StorageConfig;

pub const INPUTS_PREFIX: &str = "inputs/";
pub const OUTPUTS_PREFIX: &str = "outputs/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store error: {0}")] Backend(String),
    #[error("unexpected status {0}")] Status(u16),
}

impl From<S3Error> for StorageError {
    fn from(e: S3Error) -> Self { StorageError::Backend(e.to_string()) }
}

/// Minimal key/value blob operations the gateway needs from an object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;
    async fn presign_get(&self, bucket: &str, key: &str, expiry_secs: u32) -> Result<String, StorageError>;
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
    fn object_url(&self, bucket: &str, key: &str) -> String;
}

/// S3-compatible backend (MinIO in local development), path-style addressing.
pub struct S3BlobStore {
    region: Region,
    credentials: Credentials,
    endpoint: String,
}

impl S3BlobStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config.endpoint_url();
        let region = Region::Custom { region: config.region.clone(), endpoint: endpoint.clone() };
        let credentials = Credentials::new(Some(config.access_key.as_str()), Some(config.secret_key.as_str()), None, None, None)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { region, credentials, endpoint })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        Ok(Bucket::new(name, self.region.clone(), self.credentials.clone())?.with_path_style())
    }
}

fn check_status(code: u16) -> Result<(), StorageError> {
    if (200..300).contains(&code) { Ok(()) } else { Err(StorageError::Status(code)) }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.bucket(bucket)?.exists().await?)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let resp = Bucket::create_with_path_style(
            bucket,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await?;
        check_status(resp.response_code)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let resp = self.bucket(bucket)?.put_object_with_content_type(key, &data, content_type).await?;
        check_status(resp.status_code())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expiry_secs: u32) -> Result<String, StorageError> {
        Ok(self.bucket(bucket)?.presign_get(key, expiry_secs, None).await?)
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let pages = self.bucket(bucket)?.list(prefix.to_string(), None).await?;
        Ok(pages.into_iter().flat_map(|page| page.contents).map(|obj| obj.key).collect())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let resp = self.bucket(bucket)?.delete_object(key).await?;
        check_status(resp.status_code())
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }
}

/// Bucket-scoped wrapper that never fails hard: every error is logged and
/// reported as `None`, `false` or an empty list.
pub struct StorageGateway {
    store: Arc<dyn BlobStore>,
    bucket: String,
    presign_expiry_secs: u32,
}

impl StorageGateway {
    pub fn new(store: Arc<dyn BlobStore>, bucket: impl Into<String>, presign_expiry_secs: u32) -> Self {
        Self { store, bucket: bucket.into(), presign_expiry_secs }
    }

    pub fn bucket(&self) -> &str { &self.bucket }

    pub async fn ensure_bucket(&self, name: &str) -> bool {
        let result = async {
            if self.store.bucket_exists(name).await? {
                info!("Bucket '{}' already exists", name);
            } else {
                self.store.create_bucket(name).await?;
                info!("🪣 Bucket '{}' created successfully", name);
            }
            Ok::<_, StorageError>(())
        }
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("❌ Error creating bucket '{}': {}", name, e);
                false
            }
        }
    }

    /// Writes `data` under `key`, creating the bucket first if needed. Returns the direct object URL.
    pub async fn put(&self, key: &str, data: impl Into<Bytes>, content_type: &str) -> Option<String> {
        if !self.ensure_bucket(&self.bucket).await {
            return None;
        }
        let data = data.into();
        let size = data.len();
        match self.store.put_object(&self.bucket, key, data, content_type).await {
            Ok(()) => {
                info!("☁️ Uploaded {} ({} bytes) to bucket '{}'", key, size, self.bucket);
                Some(self.store.object_url(&self.bucket, key))
            }
            Err(e) => {
                error!("❌ Error uploading {}: {}", key, e);
                None
            }
        }
    }

    pub async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Option<String> {
        match tokio::fs::read(path).await {
            Ok(data) => self.put(key, data, content_type).await,
            Err(e) => {
                error!("❌ File not found for upload {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn presigned_url(&self, key: &str) -> Option<String> {
        self.store
            .presign_get(&self.bucket, key, self.presign_expiry_secs)
            .await
            .map_err(|e| error!("❌ Error getting presigned URL for {}: {}", key, e))
            .ok()
    }

    pub async fn list(&self, prefix: &str) -> Vec<String> {
        self.store.list(&self.bucket, prefix).await.unwrap_or_else(|e| {
            error!("❌ Error listing '{}': {}", prefix, e);
            Vec::new()
        })
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(&self.bucket, key).await {
            Ok(()) => {
                info!("🗑️ Deleted object {}", key);
                true
            }
            Err(e) => {
                error!("❌ Error deleting {}: {}", key, e);
                false
            }
        }
    }
}
