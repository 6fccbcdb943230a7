//! Error types for the object store and the publish pipeline.

use std::fmt;

use sitepress_core::ValidationError;

use crate::store::ObjectId;

/// Transport-level failures reported by an [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Object or ref does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credential rejected (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status, with the store's own diagnostic.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The store answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Whether the request may have reached the store even though no answer
    /// came back.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Step of the four-stage commit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveBranch,
    ResolveBaseTree,
    CreateBlob,
    CreateTree,
    CreateRevision,
    UpdateBranch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ResolveBranch => "resolve branch tip",
            Stage::ResolveBaseTree => "resolve base tree",
            Stage::CreateBlob => "create content object",
            Stage::CreateTree => "create tree",
            Stage::CreateRevision => "create revision",
            Stage::UpdateBranch => "update branch",
        })
    }
}

/// Publish failures. Every variant aborts the whole publish; objects created
/// before the failure stay unreferenced in the store.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Rejected locally before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{stage} failed: {source}")]
    RemoteRead {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("{stage} failed{}: {source}", at_path(.path))]
    RemoteWrite {
        stage: Stage,
        path: Option<String>,
        #[source]
        source: StoreError,
    },

    /// The branch moved away from the baseline; retry the whole sequence.
    #[error("branch {branch} moved during publish (expected {}, found {})", show(.expected), show(.actual))]
    Conflict {
        branch: String,
        expected: Option<ObjectId>,
        actual: Option<ObjectId>,
    },

    #[error("{stage} timed out{}", at_path(.path))]
    Timeout { stage: Stage, path: Option<String> },

    /// The branch update was sent but neither its response nor a follow-up
    /// read of the tip arrived. Re-read the branch before retrying.
    #[error("could not confirm branch {branch} now points at {revision}: {source}")]
    Unconfirmed {
        branch: String,
        revision: ObjectId,
        #[source]
        source: StoreError,
    },

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PublishError {
    /// Only conflicts are safe to retry automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::RemoteRead { .. } => "remoteRead",
            Self::RemoteWrite { .. } => "remoteWrite",
            Self::Conflict { .. } => "conflict",
            Self::Timeout { .. } => "timeout",
            Self::Unconfirmed { .. } => "unconfirmed",
            Self::Serialize(_) => "serialize",
        }
    }

    pub(crate) fn read(stage: Stage) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::Timeout(_) => Self::Timeout { stage, path: None },
            source => Self::RemoteRead { stage, source },
        }
    }

    pub(crate) fn write(stage: Stage, path: Option<&str>) -> impl FnOnce(StoreError) -> Self {
        let path = path.map(str::to_string);
        move |source| match source {
            StoreError::Timeout(_) => Self::Timeout { stage, path },
            source => Self::RemoteWrite {
                stage,
                path,
                source,
            },
        }
    }
}

fn at_path(path: &Option<String>) -> String {
    path.as_deref()
        .map(|p| format!(" for {p}"))
        .unwrap_or_default()
}

fn show(id: &Option<ObjectId>) -> String {
    id.as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no branch".to_string())
}
