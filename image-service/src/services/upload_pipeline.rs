use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::MetadataStore;
use crate::models::{ConflictPolicy, ImageRecord};
use crate::queue::Queue;
use crate::storage::ObjectStore;
use shared::messaging::ImageEvent;
use shared::{Result, ServiceError};

/// Extension of `name`: whatever follows the last `.`, or the whole name
/// when there is no dot.
pub fn derive_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Content type served for `name`, inferred from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    match derive_extension(name).to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Store the blob, record its metadata, then announce it on the queue
pub struct UploadPipeline {
    object_store: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    queue: Arc<dyn Queue>,
    on_conflict: ConflictPolicy,
}

impl UploadPipeline {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        queue: Arc<dyn Queue>,
        on_conflict: ConflictPolicy,
    ) -> Self {
        Self {
            object_store,
            metadata,
            queue,
            on_conflict,
        }
    }

    /// Run one upload through the pipeline.
    ///
    /// A failure after the blob write leaves the blob in place; nothing is
    /// rolled back.
    pub async fn upload(&self, name: &str, data: Bytes) -> Result<ImageRecord> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("file name cannot be empty".to_string()));
        }

        let size = i64::try_from(data.len())
            .map_err(|_| ServiceError::InvalidInput("file too large".to_string()))?;
        let record = ImageRecord::new(name, size, derive_extension(name));

        if self.on_conflict == ConflictPolicy::Reject {
            let existing = self
                .metadata
                .get(name)
                .await
                .map_err(|e| ServiceError::upload_failed("metadata", e))?;
            if existing.is_some() {
                return Err(ServiceError::DuplicateName(name.to_string()));
            }
        }

        self.object_store
            .put(name, data, content_type_for(name))
            .await
            .map_err(|e| ServiceError::upload_failed("storage", e))?;

        let recorded = match self.on_conflict {
            ConflictPolicy::Overwrite => self.metadata.upsert(&record).await,
            ConflictPolicy::Reject => self.metadata.insert(&record).await,
        };
        if let Err(e) = recorded {
            warn!("Blob for {} stored but metadata write failed: {}", name, e);
            return Err(ServiceError::upload_failed("metadata", e));
        }

        let event = ImageEvent::from(record.upload_event())
            .to_json()
            .map_err(|e| ServiceError::upload_failed("queue", e.into()))?;
        let message_id = self
            .queue
            .send(&event)
            .await
            .map_err(|e| ServiceError::upload_failed("queue", e))?;

        info!(
            "Uploaded {} ({} bytes, extension={}), queued event {}",
            record.name, record.size, record.extension, message_id
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryMetadataStore, MockMetadataStore};
    use crate::queue::{MemoryQueue, MockQueue};
    use crate::storage::{MemoryObjectStore, MockObjectStore};
    use pretty_assertions::assert_eq;
    use shared::messaging::UploadEvent;

    struct Fixture {
        store: Arc<MemoryObjectStore>,
        metadata: Arc<MemoryMetadataStore>,
        queue: Arc<MemoryQueue>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryObjectStore::new()),
                metadata: Arc::new(MemoryMetadataStore::new()),
                queue: Arc::new(MemoryQueue::new()),
            }
        }

        fn pipeline(&self, on_conflict: ConflictPolicy) -> UploadPipeline {
            UploadPipeline::new(
                self.store.clone(),
                self.metadata.clone(),
                self.queue.clone(),
                on_conflict,
            )
        }
    }

    #[test]
    fn test_derive_extension() {
        assert_eq!(derive_extension("cat.png"), "png");
        assert_eq!(derive_extension("a.tar.gz"), "gz");
        assert_eq!(derive_extension("noext"), "noext");
        assert_eq!(derive_extension("trailing."), "");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("x.jpg"), "image/jpeg");
        assert_eq!(content_type_for("x.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("x.png"), "image/png");
        assert_eq!(content_type_for("x.gif"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_stores_records_and_enqueues() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(ConflictPolicy::Overwrite);

        let record = pipeline
            .upload("cat.png", Bytes::from_static(&[1, 2, 3, 4, 5]))
            .await
            .unwrap();
        assert_eq!(record.name, "cat.png");
        assert_eq!(record.size, 5);
        assert_eq!(record.extension, "png");

        let blob = fixture.store.get("cat.png").await.unwrap();
        assert_eq!(blob, Some(Bytes::from_static(&[1, 2, 3, 4, 5])));
        assert_eq!(fixture.store.content_type("cat.png").await.as_deref(), Some("image/png"));

        let stored = fixture.metadata.get("cat.png").await.unwrap().unwrap();
        assert_eq!(stored, record);

        let bodies = fixture.queue.bodies().await;
        assert_eq!(bodies.len(), 1);
        let event = ImageEvent::from_json(&bodies[0]).unwrap();
        assert_eq!(
            event,
            ImageEvent::ImageUploaded(UploadEvent {
                name: "cat.png".to_string(),
                size: 5,
                extension: "png".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_upload_without_dot_uses_whole_name() {
        let fixture = Fixture::new();
        let record = fixture
            .pipeline(ConflictPolicy::Overwrite)
            .upload("noext", Bytes::new())
            .await
            .unwrap();
        assert_eq!(record.extension, "noext");
        assert_eq!(record.size, 0);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let fixture = Fixture::new();
        let err = fixture
            .pipeline(ConflictPolicy::Overwrite)
            .upload("  ", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(fixture.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing_image() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(ConflictPolicy::Overwrite);

        pipeline.upload("cat.png", Bytes::from_static(b"old")).await.unwrap();
        pipeline.upload("cat.png", Bytes::from_static(b"newer")).await.unwrap();

        let stored = fixture.metadata.get("cat.png").await.unwrap().unwrap();
        assert_eq!(stored.size, 5);
        assert_eq!(
            fixture.store.get("cat.png").await.unwrap(),
            Some(Bytes::from_static(b"newer"))
        );
        assert_eq!(fixture.queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_reject_policy_keeps_first_upload() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(ConflictPolicy::Reject);

        pipeline.upload("cat.png", Bytes::from_static(b"old")).await.unwrap();
        let err = pipeline
            .upload("cat.png", Bytes::from_static(b"newer"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateName(ref name) if name == "cat.png"));
        assert_eq!(
            fixture.store.get("cat.png").await.unwrap(),
            Some(Bytes::from_static(b"old"))
        );
        assert_eq!(fixture.queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_reject_policy_maps_insert_race_to_duplicate() {
        let mut metadata = MockMetadataStore::new();
        metadata.expect_get().times(1).returning(|_| Ok(None));
        metadata
            .expect_insert()
            .times(1)
            .returning(|record| Err(ServiceError::DuplicateName(record.name.clone())));
        metadata.expect_upsert().never();
        let mut store = MockObjectStore::new();
        store.expect_put().times(1).returning(|_, _, _| Ok(()));
        let mut queue = MockQueue::new();
        queue.expect_send().never();

        let pipeline = UploadPipeline::new(
            Arc::new(store),
            Arc::new(metadata),
            Arc::new(queue),
            ConflictPolicy::Reject,
        );
        let err = pipeline
            .upload("cat.png", Bytes::from_static(b"data"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateName(ref name) if name == "cat.png"));
        assert_eq!(err.http_status_code(), 409);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_of_different_names() {
        let fixture = Fixture::new();
        let pipeline = Arc::new(fixture.pipeline(ConflictPolicy::Overwrite));

        let first = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.upload("a.jpg", Bytes::from(vec![0u8; 64])).await })
        };
        let second = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.upload("b.png", Bytes::from(vec![1u8; 128])).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let a = fixture.metadata.get("a.jpg").await.unwrap().unwrap();
        let b = fixture.metadata.get("b.png").await.unwrap().unwrap();
        assert_eq!((a.size, a.extension.as_str()), (64, "jpg"));
        assert_eq!((b.size, b.extension.as_str()), (128, "png"));
        assert_eq!(fixture.store.get("a.jpg").await.unwrap().unwrap().len(), 64);
        assert_eq!(fixture.store.get("b.png").await.unwrap().unwrap().len(), 128);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_upload_failed() {
        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .returning(|_, _, _| Err(ServiceError::Storage("bucket unavailable".to_string())));
        let mut metadata = MockMetadataStore::new();
        metadata.expect_upsert().never();
        let mut queue = MockQueue::new();
        queue.expect_send().never();

        let pipeline = UploadPipeline::new(
            Arc::new(store),
            Arc::new(metadata),
            Arc::new(queue),
            ConflictPolicy::Overwrite,
        );
        let err = pipeline
            .upload("cat.png", Bytes::from_static(b"data"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::UploadFailed(_)));
        assert!(err.to_string().contains("bucket unavailable"));
    }

    #[tokio::test]
    async fn test_queue_failure_leaves_blob_and_row() {
        let fixture = Fixture::new();
        let mut queue = MockQueue::new();
        queue
            .expect_send()
            .times(1)
            .returning(|_| Err(ServiceError::Queue("connection refused".to_string())));

        let pipeline = UploadPipeline::new(
            fixture.store.clone(),
            fixture.metadata.clone(),
            Arc::new(queue),
            ConflictPolicy::Overwrite,
        );
        let err = pipeline
            .upload("cat.png", Bytes::from_static(b"data"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::UploadFailed(_)));
        assert!(fixture.store.get("cat.png").await.unwrap().is_some());
        assert!(fixture.metadata.get("cat.png").await.unwrap().is_some());
    }
}
