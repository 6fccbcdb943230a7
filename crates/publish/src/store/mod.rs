//! Object store seam: the handful of Git object operations the commit
//! builder needs, nothing more.

pub mod github;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Content address of a blob, tree or revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, the way Git abbreviates.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable revision (commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: ObjectId,
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Browser URL for the revision, when the store has one.
    pub url: Option<String>,
}

/// One `path → blob` overlay applied on top of a base tree.
/// Every entry is a regular, non-executable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub blob: ObjectId,
}

/// Result of a conditional branch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The branch now points at the new revision.
    Updated,
    /// The branch no longer matched the expected revision. `actual` carries
    /// the current tip when the store reports it.
    Conflict { actual: Option<ObjectId> },
}

/// Remote content-addressable store holding the site repository.
///
/// Implementations never retry on their own and never move a branch except
/// through [`ObjectStore::update_branch`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Current tip of `branch`, or `None` if the branch does not exist yet.
    async fn read_branch(&self, branch: &str) -> StoreResult<Option<ObjectId>>;

    async fn read_revision(&self, id: &ObjectId) -> StoreResult<Revision>;

    /// Store `bytes` as a content object. Identical bytes yield the same id.
    async fn create_blob(&self, bytes: &[u8]) -> StoreResult<ObjectId>;

    /// Create a tree: `base` (if any) with `entries` overlaid. Paths not in
    /// `entries` keep whatever `base` had.
    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> StoreResult<ObjectId>;

    async fn create_revision(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> StoreResult<Revision>;

    /// Move `branch` from `expected` to `new`, only if it still points at
    /// `expected` (`None` = the branch must not exist yet).
    async fn update_branch(
        &self,
        branch: &str,
        expected: Option<&ObjectId>,
        new: &ObjectId,
    ) -> StoreResult<CasOutcome>;
}
