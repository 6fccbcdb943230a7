use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sitepress_core::{FailedEvent, PublishEvent, PublishedEvent};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/publish", post(publish))
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    content: Option<Value>,
}

/// Publish the editor's document: every asset and `content.json` in one
/// revision.
async fn publish(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let content = request
        .content
        .filter(Value::is_object)
        .ok_or_else(|| ApiError::BadRequest("Missing content".to_string()))?;

    let publisher = state.publisher();
    let branch = publisher.config().branch.clone();
    match publisher.publish(&content).await {
        Ok(outcome) => {
            state.event_bus().publish(PublishEvent::Published(PublishedEvent {
                branch,
                revision: outcome.revision.to_string(),
                commit_url: outcome.commit_url.clone(),
                asset_count: outcome.assets.len(),
                timestamp: Utc::now(),
            }));
            Ok(Json(json!({
                "ok": true,
                "commitUrl": outcome.commit_url,
                "revision": outcome.revision,
                "contentPath": outcome.content_path,
                "assets": outcome.assets,
                "attempts": outcome.attempts,
            })))
        }
        Err(err) => {
            tracing::warn!(branch = %branch, kind = err.kind(), error = %err, "publish failed");
            state.event_bus().publish(PublishEvent::Failed(FailedEvent {
                branch,
                kind: err.kind().to_string(),
                message: err.to_string(),
                timestamp: Utc::now(),
            }));
            Err(err.into())
        }
    }
}
