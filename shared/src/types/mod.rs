//! Shared type definitions for the image service
//!
//! Only the error taxonomy lives here; event payloads are in
//! [`crate::messaging`].

pub mod error;

pub use error::ServiceError;
