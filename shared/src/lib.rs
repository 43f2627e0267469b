//! Shared utilities and types for the image service workspace

// Re-export common dependencies
pub use anyhow;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
pub use uuid;

pub mod messaging;
pub mod observability;
pub mod types;

pub use types::error::ServiceError;

pub type Result<T> = std::result::Result<T, ServiceError>;
