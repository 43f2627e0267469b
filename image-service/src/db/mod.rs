// Metadata table access

pub mod memory;
pub mod repository;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use shared::Result;

use crate::models::ImageRecord;

pub use memory::MemoryMetadataStore;
pub use repository::PgMetadataStore;

/// The `images` table: one row per unique name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new row; fails with `DuplicateName` when the name exists.
    async fn insert(&self, record: &ImageRecord) -> Result<()>;

    /// Insert or replace the row for `record.name`.
    async fn upsert(&self, record: &ImageRecord) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Option<ImageRecord>>;

    /// Every row, ordered by name.
    async fn list(&self) -> Result<Vec<ImageRecord>>;

    /// Remove the row for `name`. Returns whether a row existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// A uniformly chosen row, or `None` when the table is empty.
    ///
    /// Loads the whole table; backends that can sample server-side override it.
    async fn random(&self) -> Result<Option<ImageRecord>> {
        let records = self.list().await?;
        Ok(records.choose(&mut rand::thread_rng()).cloned())
    }
}
