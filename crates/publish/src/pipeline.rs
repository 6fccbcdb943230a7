//! End-to-end publish: normalize, extract assets, commit, retry on conflict.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use sitepress_core::{extract_assets, normalize, AssetPolicy, ContentDocument};
use tracing::{info, warn};

use crate::commit::{CommitBuilder, FileChange, DEFAULT_CONCURRENCY};
use crate::error::PublishError;
use crate::store::{ObjectId, ObjectStore};

pub const DEFAULT_CONTENT_PATH: &str = "content.json";
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub branch: String,
    /// Where the serialized document lands in the repository.
    pub content_path: String,
    pub assets: AssetPolicy,
    /// Extra attempts after a conflict. Zero disables retrying.
    pub conflict_retries: u32,
    pub concurrency: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_string(),
            content_path: DEFAULT_CONTENT_PATH.to_string(),
            assets: AssetPolicy::default(),
            conflict_retries: 2,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// A successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub revision: ObjectId,
    pub commit_url: Option<String>,
    pub content_path: String,
    /// Repository paths of the assets extracted in this publish.
    pub assets: Vec<String>,
    /// Commit attempts made, including the successful one.
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct Publisher {
    builder: CommitBuilder,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, config: PublisherConfig) -> Self {
        let builder = CommitBuilder::new(store).with_concurrency(config.concurrency);
        Self { builder, config }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn backend(&self) -> &'static str {
        self.builder.store().backend()
    }

    /// Publish an untrusted document as received from the editor.
    pub async fn publish(&self, raw: &Value) -> Result<PublishOutcome, PublishError> {
        self.publish_at(raw, Utc::now()).await
    }

    pub async fn publish_at(
        &self,
        raw: &Value,
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome, PublishError> {
        self.publish_document(&normalize(raw), now).await
    }

    /// Publish an already normalized document. `document` itself is never
    /// modified; extraction runs on a copy.
    pub async fn publish_document(
        &self,
        document: &ContentDocument,
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome, PublishError> {
        let extraction = extract_assets(
            document.clone(),
            &self.config.assets,
            now.timestamp_millis(),
        )?;
        let assets: Vec<String> = extraction.assets.iter().map(|a| a.path.clone()).collect();

        let mut files: Vec<FileChange> = extraction
            .assets
            .into_iter()
            .map(|asset| FileChange::new(asset.path, asset.bytes))
            .collect();
        let content = serde_json::to_string_pretty(&extraction.document)?;
        files.push(FileChange::new(
            self.config.content_path.clone(),
            content.into_bytes(),
        ));

        let message = format!(
            "Publish content ({})",
            now.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let branch = self.config.branch.as_str();

        let mut attempts = 0;
        let revision = loop {
            attempts += 1;
            match self.builder.commit(branch, &files, &message).await {
                Ok(revision) => break revision,
                Err(err) if err.is_retryable() && attempts <= self.config.conflict_retries => {
                    warn!(branch, attempt = attempts, error = %err, "publish conflicted, retrying from a fresh tip");
                }
                Err(err) => return Err(err),
            }
        };

        info!(
            branch,
            revision = %revision.id,
            assets = assets.len(),
            attempts,
            "content published"
        );
        Ok(PublishOutcome {
            revision: revision.id,
            commit_url: revision.url,
            content_path: self.config.content_path.clone(),
            assets,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn publishes_normalized_document() {
        let store = MemoryStore::new();
        let publisher = Publisher::new(Arc::new(store.clone()), PublisherConfig::default());
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let outcome = publisher
            .publish_at(&json!({"site": {"title": "Pies"}, "blocks": [{"type": "spacer", "spacer": {"height": 20}}]}), now)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert!(outcome.assets.is_empty());
        assert_eq!(
            store.message(&outcome.revision).as_deref(),
            Some("Publish content (2024-05-01T12:00:00.000Z)")
        );
        let bytes = store.read_file(&outcome.revision, "content.json").unwrap();
        let published: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(published["site"]["title"], "Pies");
        assert_eq!(published["blocks"][0]["spacer"]["height"], 20.0);
        // Indented output.
        assert!(String::from_utf8(bytes).unwrap().contains("\n  \"version\": 1"));
    }

    #[tokio::test]
    async fn custom_content_path() {
        let store = MemoryStore::new();
        let config = PublisherConfig {
            content_path: "data/site.json".to_string(),
            ..PublisherConfig::default()
        };
        let publisher = Publisher::new(Arc::new(store.clone()), config);

        let outcome = publisher.publish(&json!(null)).await.unwrap();
        assert_eq!(outcome.content_path, "data/site.json");
        assert_eq!(store.paths(&outcome.revision), ["data/site.json"]);
    }
}
