// S3/MinIO client implementation

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use super::ObjectStore;
use crate::config::StorageConfig;
use shared::{Result, ServiceError};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the default credential chain.
    ///
    /// A custom endpoint switches to path-style addressing when configured,
    /// which MinIO requires.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared_config = loader.load().await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared_config)
                .force_path_style(config.force_path_style)
                .build(),
        );

        info!("S3 client initialized for bucket: {}", config.bucket);

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }

    fn storage_error<E>(action: &str, key: &str, err: E) -> ServiceError
    where
        E: std::error::Error,
    {
        ServiceError::Storage(format!(
            "{} '{}' failed: {}",
            action,
            key,
            DisplayErrorContext(err)
        ))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        debug!("Uploading object to S3: {} ({} bytes)", key, data.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::storage_error("put", key, e))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        debug!("Downloading object from S3: {}", key);

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                debug!("Object not found in S3: {}", key);
                return Ok(None);
            }
            Err(e) => return Err(Self::storage_error("get", key, e)),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Self::storage_error("read body of", key, e))?
            .into_bytes();

        Ok(Some(data))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!("Deleting object from S3: {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::storage_error("delete", key, e))?;

        Ok(())
    }
}
