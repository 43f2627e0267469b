use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::models::UploadResponse;
use crate::AppState;

/// Multipart form field carrying the image
const FILE_FIELD: &str = "file";

/// Handle `POST /upload`
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    tracing::info!("Received image upload request");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            tracing::debug!("Skipping multipart field: {:?}", field.name());
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file field has no filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;

        let record = state.pipeline.upload(&name, data).await?;

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            name: record.name,
            size: record.size,
        }));
    }

    Err(ApiError::BadRequest(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}
