use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/github-status", get(github_status))
}

/// Repository metadata, fetched with the server-side credential. A quick way
/// for the editor to tell whether publishing can work at all.
async fn github_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let branch = &state.publisher().config().branch;
    let Some(github) = state.github() else {
        return Ok(Json(json!({
            "backend": state.publisher().backend(),
            "branch": branch,
        })));
    };

    let info = github.repository_info().await?;
    Ok(Json(json!({
        "owner": info.owner,
        "repo": info.repo,
        "branch": branch,
        "defaultBranch": info.default_branch,
        "private": info.private,
    })))
}
