use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

/// `GET /`: the zone and region this instance runs in.
///
/// Lookup failures still answer 200, with an `error` field in the body.
pub async fn availability_zone(State(state): State<AppState>) -> Response {
    match state.discovery.placement().await {
        Ok(placement) => Json(placement).into_response(),
        Err(e) => {
            tracing::warn!("Availability zone lookup failed: {}", e);
            Json(json!({ "error": e.to_string() })).into_response()
        }
    }
}
