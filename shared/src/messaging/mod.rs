/// Messaging payloads shared between the upload path and the relay
pub mod event_types;

pub use event_types::*;
