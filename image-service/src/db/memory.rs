use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::MetadataStore;
use crate::models::ImageRecord;
use shared::{Result, ServiceError};

/// Metadata table kept in process memory
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<BTreeMap<String, ImageRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: &ImageRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.name) {
            return Err(ServiceError::DuplicateName(record.name.clone()));
        }
        records.insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn upsert(&self, record: &ImageRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<ImageRecord>> {
        Ok(self.records.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_name() {
        let store = MemoryMetadataStore::new();
        store.insert(&ImageRecord::new("cat.png", 3, "png")).await.unwrap();

        let err = store
            .insert(&ImageRecord::new("cat.png", 5, "png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateName(ref name) if name == "cat.png"));
        assert_eq!(store.get("cat.png").await.unwrap().unwrap().size, 3);
    }

    #[tokio::test]
    async fn test_upsert_replaces_row() {
        let store = MemoryMetadataStore::new();
        store.upsert(&ImageRecord::new("cat.png", 3, "png")).await.unwrap();
        store.upsert(&ImageRecord::new("cat.png", 7, "png")).await.unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, 7);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let store = MemoryMetadataStore::new();
        store.insert(&ImageRecord::new("cat.png", 3, "png")).await.unwrap();

        assert!(store.delete("cat.png").await.unwrap());
        assert!(!store.delete("cat.png").await.unwrap());
        assert!(store.get("cat.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_random_on_empty_table() {
        let store = MemoryMetadataStore::new();
        assert!(store.random().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_random_returns_existing_record() {
        let store = MemoryMetadataStore::new();
        for name in ["a.png", "b.jpg", "c.gif"] {
            store.insert(&ImageRecord::new(name, 1, "x")).await.unwrap();
        }

        for _ in 0..20 {
            let picked = store.random().await.unwrap().unwrap();
            assert!(["a.png", "b.jpg", "c.gif"].contains(&picked.name.as_str()));
        }
    }
}
