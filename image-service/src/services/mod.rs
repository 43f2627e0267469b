pub mod catalog;
pub mod upload_pipeline;

pub use catalog::{Download, ImageCatalog};
pub use upload_pipeline::UploadPipeline;
