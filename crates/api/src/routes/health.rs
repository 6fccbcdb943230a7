use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Reports the publish target without touching the remote store.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.publisher().backend(),
        "branch": state.publisher().config().branch,
        "subscribers": state.event_bus().subscriber_count(),
    }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
