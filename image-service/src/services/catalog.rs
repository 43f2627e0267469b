use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

use super::upload_pipeline::content_type_for;
use crate::db::MetadataStore;
use crate::models::ImageRecord;
use crate::storage::ObjectStore;
use shared::{Result, ServiceError};

/// A blob ready to serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub data: Bytes,
    pub content_type: &'static str,
}

/// Reads and deletes across the object store and the metadata table
pub struct ImageCatalog {
    object_store: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl ImageCatalog {
    pub fn new(object_store: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            object_store,
            metadata,
        }
    }

    pub async fn download(&self, name: &str) -> Result<Download> {
        let data = self
            .object_store
            .get(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))?;

        Ok(Download {
            data,
            content_type: content_type_for(name),
        })
    }

    pub async fn metadata(&self, name: &str) -> Result<ImageRecord> {
        self.metadata
            .get(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }

    pub async fn random(&self) -> Result<ImageRecord> {
        self.metadata.random().await?.ok_or(ServiceError::NoRecords)
    }

    /// Delete the blob, then the row. The two steps are independent: a
    /// failure on the row leaves the blob already gone.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.object_store
            .delete(name)
            .await
            .map_err(|e| ServiceError::delete_failed("storage", e))?;

        let existed = self
            .metadata
            .delete(name)
            .await
            .map_err(|e| ServiceError::delete_failed("metadata", e))?;

        info!("Deleted image {} (metadata row existed={})", name, existed);
        Ok(())
    }
}
