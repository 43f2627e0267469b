use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::MessageResponse;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubscriptionQuery {
    #[validate(email)]
    pub email: String,
}

fn validated(query: Result<Query<SubscriptionQuery>, QueryRejection>) -> ApiResult<String> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    query
        .validate()
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not a valid e-mail address", query.email)))?;
    Ok(query.email)
}

/// `POST /subscribe?email=`
pub async fn subscribe(
    State(state): State<AppState>,
    query: Result<Query<SubscriptionQuery>, QueryRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let email = validated(query)?;
    state.notifier.subscribe(&email).await?;

    Ok(Json(MessageResponse::new(format!(
        "Subscribed {} to upload notifications",
        email
    ))))
}

/// `POST /unsubscribe?email=`
pub async fn unsubscribe(
    State(state): State<AppState>,
    query: Result<Query<SubscriptionQuery>, QueryRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let email = validated(query)?;
    let message = if state.notifier.unsubscribe(&email).await? {
        format!("Unsubscribed {} from upload notifications", email)
    } else {
        format!("{} was not subscribed", email)
    };

    Ok(Json(MessageResponse::new(message)))
}
