//! Common error types for the image service

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No records available")]
    NoRecords,

    #[error("An image named '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::NoRecords => 404,
            ServiceError::DuplicateName(_) => 409,
            ServiceError::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// Wrap a failure from one stage of the upload chain.
    ///
    /// Duplicate names and invalid input keep their own kind so callers can
    /// still tell a conflict or a bad request apart from a backend failure.
    pub fn upload_failed(stage: &str, cause: ServiceError) -> Self {
        match cause {
            ServiceError::DuplicateName(_) | ServiceError::InvalidInput(_) => cause,
            ServiceError::UploadFailed(_) => cause,
            other => ServiceError::UploadFailed(format!("{} stage: {}", stage, other)),
        }
    }

    pub fn delete_failed(stage: &str, cause: ServiceError) -> Self {
        match cause {
            ServiceError::DeleteFailed(_) => cause,
            other => ServiceError::DeleteFailed(format!("{} stage: {}", stage, other)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_) | ServiceError::NoRecords)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("row not found".to_string()),
            other => ServiceError::Database(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        ServiceError::Queue(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("serialization: {}", err))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(ServiceError::NotFound("cat.png".to_string()).http_status_code(), 404);
        assert_eq!(ServiceError::NoRecords.http_status_code(), 404);
        assert_eq!(ServiceError::DuplicateName("cat.png".to_string()).http_status_code(), 409);
        assert_eq!(ServiceError::InvalidInput("test".to_string()).http_status_code(), 400);
        assert_eq!(ServiceError::UploadFailed("test".to_string()).http_status_code(), 500);
        assert_eq!(ServiceError::DeleteFailed("test".to_string()).http_status_code(), 500);
    }

    #[test]
    fn test_upload_failed_carries_cause() {
        let err = ServiceError::upload_failed(
            "store",
            ServiceError::Storage("bucket unreachable".to_string()),
        );
        assert!(matches!(err, ServiceError::UploadFailed(_)));
        assert!(err.to_string().contains("bucket unreachable"));
        assert!(err.to_string().contains("store"));
    }

    #[test]
    fn test_upload_failed_keeps_duplicate_name() {
        let err = ServiceError::upload_failed(
            "record",
            ServiceError::DuplicateName("cat.png".to_string()),
        );
        assert!(matches!(err, ServiceError::DuplicateName(ref name) if name == "cat.png"));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
