pub mod discovery;
pub mod health;
pub mod images;
pub mod subscription;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config.upload.max_bytes;

    Router::new()
        .route("/", get(discovery::availability_zone))
        .route("/health", get(health::health_check))
        .route("/upload", post(upload::upload_image))
        .route("/download/:name", get(images::download_image))
        .route("/metadata/:name", get(images::image_metadata))
        .route("/random", get(images::random_image))
        .route("/delete/:name", delete(images::delete_image))
        .route("/subscribe", post(subscription::subscribe))
        .route("/unsubscribe", post(subscription::unsubscribe))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
