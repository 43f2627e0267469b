use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ObjectStore;
use shared::Result;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Object store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.content_type.clone())
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|object| object.data.clone()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites_existing_blob() {
        let store = MemoryObjectStore::new();
        store.put("cat.png", Bytes::from_static(b"one"), "image/png").await.unwrap();
        store.put("cat.png", Bytes::from_static(b"two"), "image/png").await.unwrap();

        assert_eq!(store.get("cat.png").await.unwrap(), Some(Bytes::from_static(b"two")));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.content_type("cat.png").await.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_delete_missing_key_succeeds() {
        let store = MemoryObjectStore::new();
        store.delete("ghost.png").await.unwrap();
        assert_eq!(store.get("ghost.png").await.unwrap(), None);
    }
}
