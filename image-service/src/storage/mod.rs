// Blob storage: S3/MinIO in production, an in-process map for local runs and tests

pub mod memory;
pub mod s3_client;

use async_trait::async_trait;
use bytes::Bytes;
use shared::Result;

pub use memory::MemoryObjectStore;
pub use s3_client::S3ObjectStore;

/// Byte blobs keyed by name in a single bucket
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key`, replacing any existing blob.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Read the blob under `key`; `None` when it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Remove the blob under `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
