//! GitHub Git Data API client.
//!
//! Maps the [`ObjectStore`] operations onto the low-level object endpoints
//! (`/git/blobs`, `/git/trees`, `/git/commits`, `/git/refs`) of a single
//! repository.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{CasOutcome, ObjectId, ObjectStore, Revision, TreeEntry};
use crate::error::{StoreError, StoreResult};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT_VALUE: &str = concat!("sitepress/", env!("CARGO_PKG_VERSION"));

/// Connection settings for one repository.
#[derive(Clone)]
pub struct GitHubConfig {
    /// API root, without trailing slash. Overridable for GitHub Enterprise
    /// and tests.
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub token: String,
    /// Applied to every request.
    pub timeout: Duration,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GitHubConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Repository metadata reported by the status probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
    pub private: bool,
}

#[derive(Clone)]
pub struct GitHubStore {
    client: reqwest::Client,
    base_url: String,
    config: GitHubConfig,
}

impl std::fmt::Debug for GitHubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStore")
            .field("base_url", &self.base_url)
            .field("owner", &self.config.owner)
            .field("repo", &self.config.repo)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ShaBody {
    sha: String,
}

#[derive(Deserialize)]
struct RefBody {
    object: ShaBody,
}

#[derive(Deserialize)]
struct CommitBody {
    sha: String,
    tree: ShaBody,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct RepoBody {
    default_branch: String,
    #[serde(default)]
    private: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GitHubStore {
    pub fn new(config: GitHubConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT_VALUE)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {e}")))?;

        let base_url = format!(
            "{}/repos/{}/{}",
            config.api_url.trim_end_matches('/'),
            config.owner,
            config.repo
        );

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Read repository metadata; doubles as a credential check.
    pub async fn repository_info(&self) -> StoreResult<RepositoryInfo> {
        let body: RepoBody = self.get_json("").await?;
        Ok(RepositoryInfo {
            owner: self.config.owner.clone(),
            repo: self.config.repo.clone(),
            default_branch: body.default_branch,
            private: body.private,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "github request");
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> StoreResult<T> {
        let response = self.request(Method::GET, path).send().await?;
        parse(check(response).await?).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> StoreResult<T> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        parse(check(response).await?).await
    }

    /// Map a refused ref write to a conflict, looking up the current tip on
    /// a best-effort basis.
    async fn conflict(&self, branch: &str, response: Response) -> StoreResult<CasOutcome> {
        let status = response.status();
        let message = error_message(response).await;
        debug!(branch, %status, reason = %message, "branch update refused");
        let actual = match self.read_branch(branch).await {
            Ok(actual) => actual,
            Err(err) => {
                warn!(branch, error = %err, "could not read branch tip after conflict");
                None
            }
        };
        Ok(CasOutcome::Conflict { actual })
    }
}

/// Turn non-success statuses into [`StoreError`]s.
async fn check(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        _ => StoreError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn parse<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    response.json().await.map_err(StoreError::from)
}

/// GitHub's own diagnostic from an error body, or the bare status.
async fn error_message(response: Response) -> String {
    let status = response.status();
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[async_trait]
impl ObjectStore for GitHubStore {
    fn backend(&self) -> &'static str {
        "github"
    }

    async fn read_branch(&self, branch: &str) -> StoreResult<Option<ObjectId>> {
        match self
            .get_json::<RefBody>(&format!("/git/ref/heads/{branch}"))
            .await
        {
            Ok(body) => Ok(Some(ObjectId::new(body.object.sha))),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn read_revision(&self, id: &ObjectId) -> StoreResult<Revision> {
        let body: CommitBody = self.get_json(&format!("/git/commits/{id}")).await?;
        Ok(Revision {
            id: ObjectId::new(body.sha),
            tree: ObjectId::new(body.tree.sha),
            url: body.html_url,
        })
    }

    async fn create_blob(&self, bytes: &[u8]) -> StoreResult<ObjectId> {
        let content = base64::engine::general_purpose::STANDARD.encode(bytes);
        let body: ShaBody = self
            .post_json(
                "/git/blobs",
                &json!({ "content": content, "encoding": "base64" }),
            )
            .await?;
        Ok(ObjectId::new(body.sha))
    }

    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> StoreResult<ObjectId> {
        let tree: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "path": entry.path,
                    "mode": "100644",
                    "type": "blob",
                    "sha": entry.blob,
                })
            })
            .collect();
        let mut body = json!({ "tree": tree });
        if let Some(base) = base {
            body["base_tree"] = json!(base);
        }
        let created: ShaBody = self.post_json("/git/trees", &body).await?;
        Ok(ObjectId::new(created.sha))
    }

    async fn create_revision(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> StoreResult<Revision> {
        let body: CommitBody = self
            .post_json(
                "/git/commits",
                &json!({ "message": message, "tree": tree, "parents": parents }),
            )
            .await?;
        Ok(Revision {
            id: ObjectId::new(body.sha),
            tree: ObjectId::new(body.tree.sha),
            url: body.html_url,
        })
    }

    /// Non-forced ref updates are rejected unless they fast-forward. A tip
    /// that moved forward past the baseline is therefore caught, but a tip
    /// rewound to an ancestor of the baseline is not, since the new revision
    /// still fast-forwards from it. Creating a ref fails when it already
    /// exists.
    async fn update_branch(
        &self,
        branch: &str,
        expected: Option<&ObjectId>,
        new: &ObjectId,
    ) -> StoreResult<CasOutcome> {
        let response = match expected {
            Some(_) => {
                self.request(Method::PATCH, &format!("/git/refs/heads/{branch}"))
                    .json(&json!({ "sha": new, "force": false }))
                    .send()
                    .await?
            }
            None => {
                self.request(Method::POST, "/git/refs")
                    .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": new }))
                    .send()
                    .await?
            }
        };

        match response.status() {
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                self.conflict(branch, response).await
            }
            _ => {
                check(response).await?;
                Ok(CasOutcome::Updated)
            }
        }
    }
}
