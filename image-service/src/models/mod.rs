use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shared::messaging::UploadEvent;

/// One row of the `images` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ImageRecord {
    pub name: String,
    pub size: i64,
    pub extension: String,
    pub last_modified: DateTime<Utc>,
}

impl ImageRecord {
    pub fn new(name: impl Into<String>, size: i64, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            extension: extension.into(),
            last_modified: Utc::now(),
        }
    }

    pub fn upload_event(&self) -> UploadEvent {
        UploadEvent {
            name: self.name.clone(),
            size: self.size,
            extension: self.extension.clone(),
        }
    }
}

/// What happens when an upload reuses an existing name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Replace both the blob and the metadata row
    #[default]
    Overwrite,
    /// Fail with `DuplicateName`
    Reject,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &str {
        match self {
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Reject => "reject",
        }
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "upsert" => Ok(ConflictPolicy::Overwrite),
            "reject" => Ok(ConflictPolicy::Reject),
            other => Err(format!("unknown conflict policy '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub name: String,
    pub size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Availability zone lookup result for `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub availability_zone: String,
    pub region: String,
}

impl Placement {
    /// The region is the zone name without its trailing zone letter.
    pub fn from_zone(availability_zone: impl Into<String>) -> Self {
        let availability_zone = availability_zone.into();
        let mut region = availability_zone.clone();
        region.pop();
        Self {
            availability_zone,
            region,
        }
    }
}
