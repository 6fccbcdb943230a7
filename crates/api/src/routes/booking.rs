use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use sitepress_core::BookingRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/booking-request", post(booking_request))
}

/// Relay a visitor's booking request to the operator chat.
async fn booking_request(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let notifier = state
        .notifier()
        .ok_or_else(|| ApiError::Unavailable("booking relay is not configured".to_string()))?;
    let Json(request) = payload?;

    let message = request.to_message()?;
    notifier.send_html(&message).await?;
    tracing::info!(day = ?request.day, time = ?request.time, "booking request relayed");

    Ok(Json(json!({ "ok": true })))
}
