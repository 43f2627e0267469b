use async_trait::async_trait;
use sqlx::PgPool;

use super::MetadataStore;
use crate::models::ImageRecord;
use shared::{Result, ServiceError};

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Metadata store backed by the Postgres `images` table
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(code: Option<&str>) -> bool {
    code == Some(UNIQUE_VIOLATION)
}

fn map_insert_error(err: sqlx::Error, name: &str) -> ServiceError {
    if let sqlx::Error::Database(db_err) = &err {
        if is_unique_violation(db_err.code().as_deref()) {
            return ServiceError::DuplicateName(name.to_string());
        }
    }
    ServiceError::from(err)
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn insert(&self, record: &ImageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO images (name, size, extension, last_modified)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.name)
        .bind(record.size)
        .bind(&record.extension)
        .bind(record.last_modified)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &record.name))?;

        tracing::info!("Created image record: name={}", record.name);
        Ok(())
    }

    async fn upsert(&self, record: &ImageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO images (name, size, extension, last_modified)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET
                size = EXCLUDED.size,
                extension = EXCLUDED.extension,
                last_modified = EXCLUDED.last_modified
            "#,
        )
        .bind(&record.name)
        .bind(record.size)
        .bind(&record.extension)
        .bind(record.last_modified)
        .execute(&self.pool)
        .await?;

        tracing::info!("Upserted image record: name={}", record.name);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<ImageRecord>> {
        let record = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT name, size, extension, last_modified
            FROM images
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ImageRecord>> {
        let records = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT name, size, extension, last_modified
            FROM images
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let existed = result.rows_affected() > 0;
        tracing::info!("Deleted image record: name={}, existed={}", name, existed);
        Ok(existed)
    }

    async fn random(&self) -> Result<Option<ImageRecord>> {
        let record = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT name, size, extension, last_modified
            FROM images
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_code() {
        assert!(is_unique_violation(Some("23505")));
        assert!(!is_unique_violation(Some("23503")));
        assert!(!is_unique_violation(None));
    }

    #[test]
    fn test_non_database_insert_error_is_not_duplicate() {
        let err = map_insert_error(sqlx::Error::PoolTimedOut, "cat.png");
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
