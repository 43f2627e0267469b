use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Events carried on the upload queue
///
/// Serialized with the variant name in the `event` field, so an upload reads
/// `{"event":"ImageUploaded","name":"cat.png","size":42,"extension":"png"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ImageEvent {
    ImageUploaded(UploadEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    pub name: String,
    pub size: i64,
    pub extension: String,
}

impl ImageEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ImageEvent::ImageUploaded(_) => "ImageUploaded",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

impl From<UploadEvent> for ImageEvent {
    fn from(event: UploadEvent) -> Self {
        ImageEvent::ImageUploaded(event)
    }
}

/// Attribute key subscribers can filter uploads on
pub const EXTENSION_ATTRIBUTE: &str = "extension";

/// A human-readable message published to the notification topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
