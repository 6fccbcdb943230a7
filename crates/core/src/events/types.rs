use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted after each publish attempt, consumed by SSE listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PublishEvent {
    Welcome,
    Published(PublishedEvent),
    Failed(FailedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedEvent {
    pub branch: String,
    pub revision: String,
    pub commit_url: Option<String>,
    pub asset_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEvent {
    pub branch: String,
    /// Machine-readable error kind, e.g. `conflict` or `validation`.
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PublishEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            PublishEvent::Welcome => "welcome",
            PublishEvent::Published(_) => "published",
            PublishEvent::Failed(_) => "failed",
        }
    }
}
