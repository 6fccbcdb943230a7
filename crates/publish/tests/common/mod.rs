//! Shared test doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sitepress_publish::{
    CasOutcome, MemoryStore, ObjectId, ObjectStore, Revision, StoreError, StoreResult, TreeEntry,
};

/// Delegates to a [`MemoryStore`], with hooks that simulate another writer
/// or a failing remote.
#[derive(Default)]
pub struct Interfering {
    pub inner: MemoryStore,
    /// Number of upcoming revisions after which an external writer moves
    /// `main` before our branch update lands.
    pub race_next: AtomicUsize,
    /// Fail the n-th blob creation (1-based); 0 disables.
    pub fail_blob: AtomicUsize,
    pub blobs: AtomicUsize,
    pub updates: AtomicUsize,
}

#[async_trait]
impl ObjectStore for Interfering {
    fn backend(&self) -> &'static str {
        "interfering"
    }

    async fn read_branch(&self, branch: &str) -> StoreResult<Option<ObjectId>> {
        self.inner.read_branch(branch).await
    }

    async fn read_revision(&self, id: &ObjectId) -> StoreResult<Revision> {
        self.inner.read_revision(id).await
    }

    async fn create_blob(&self, bytes: &[u8]) -> StoreResult<ObjectId> {
        let n = self.blobs.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_blob.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 502,
                message: "Bad Gateway".to_string(),
            });
        }
        self.inner.create_blob(bytes).await
    }

    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> StoreResult<ObjectId> {
        self.inner.create_tree(base, entries).await
    }

    async fn create_revision(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> StoreResult<Revision> {
        let revision = self.inner.create_revision(message, tree, parents).await?;
        let pending = self.race_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.race_next.store(pending - 1, Ordering::SeqCst);
            self.inner
                .seed("main", &[("index.html", "edited elsewhere")], "external edit");
        }
        Ok(revision)
    }

    async fn update_branch(
        &self,
        branch: &str,
        expected: Option<&ObjectId>,
        new: &ObjectId,
    ) -> StoreResult<CasOutcome> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_branch(branch, expected, new).await
    }
}
