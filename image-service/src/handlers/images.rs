use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::error::ApiResult;
use crate::models::{ImageRecord, MessageResponse};
use crate::AppState;

/// `GET /download/:name`
pub async fn download_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let download = state.catalog.download(&name).await?;
    Ok(([(header::CONTENT_TYPE, download.content_type)], download.data))
}

/// `GET /metadata/:name`
pub async fn image_metadata(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ImageRecord>> {
    Ok(Json(state.catalog.metadata(&name).await?))
}

/// `GET /random`
pub async fn random_image(State(state): State<AppState>) -> ApiResult<Json<ImageRecord>> {
    Ok(Json(state.catalog.random().await?))
}

/// `DELETE /delete/:name`
pub async fn delete_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.catalog.delete(&name).await?;
    Ok(Json(MessageResponse::new(format!(
        "Image {} deleted successfully",
        name
    ))))
}
