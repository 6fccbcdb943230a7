//! Atomic commit builder.
//!
//! One publish is one revision: read the branch tip, read its tree, create a
//! content object per file, then a tree overlaying those files on the base,
//! a revision parented on the tip, and finally a compare-and-swap of the
//! branch from the tip to the new revision. Nothing is visible until that
//! last step; a failure anywhere earlier leaves only unreferenced objects.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use sitepress_core::assets::validate::validate_repo_path;
use sitepress_core::ValidationError;
use tracing::{debug, info, warn};

use crate::error::{PublishError, Stage, StoreError};
use crate::store::{CasOutcome, ObjectId, ObjectStore, Revision, TreeEntry};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// A file to write in the next revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository-relative path.
    pub path: String,
    pub bytes: Vec<u8>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Clone)]
pub struct CommitBuilder {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

impl std::fmt::Debug for CommitBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitBuilder")
            .field("backend", &self.store.backend())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl CommitBuilder {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Cap on in-flight content object creations.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Commit `files` on top of the current tip of `branch`.
    pub async fn commit(
        &self,
        branch: &str,
        files: &[FileChange],
        message: &str,
    ) -> Result<Revision, PublishError> {
        check_files(files)?;
        let baseline = self
            .store
            .read_branch(branch)
            .await
            .map_err(PublishError::read(Stage::ResolveBranch))?;
        self.commit_onto(branch, baseline.as_ref(), files, message)
            .await
    }

    /// Commit `files` on top of `baseline`, which the caller read earlier.
    /// `None` means the branch does not exist yet and will be created.
    ///
    /// Fails with [`PublishError::Conflict`] if the branch no longer points
    /// at `baseline` when the update is attempted.
    pub async fn commit_onto(
        &self,
        branch: &str,
        baseline: Option<&ObjectId>,
        files: &[FileChange],
        message: &str,
    ) -> Result<Revision, PublishError> {
        check_files(files)?;
        debug!(
            branch,
            baseline = baseline.map(ObjectId::short),
            files = files.len(),
            "starting commit"
        );

        let base_tree = match baseline {
            Some(id) => Some(
                self.store
                    .read_revision(id)
                    .await
                    .map_err(PublishError::read(Stage::ResolveBaseTree))?
                    .tree,
            ),
            None => None,
        };

        let store = &self.store;
        let uploads: Vec<_> = files.iter().map(|file| async move {
                let blob = store
                    .create_blob(&file.bytes)
                    .await
                    .map_err(PublishError::write(Stage::CreateBlob, Some(file.path.as_str())))?;
                debug!(path = %file.path, bytes = file.bytes.len(), blob = blob.short(), "content object created");
                Ok::<_, PublishError>(TreeEntry {
                    path: file.path.clone(),
                    blob,
                })
            }).collect();
        let entries: Vec<TreeEntry> = stream::iter(uploads)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let tree = self
            .store
            .create_tree(base_tree.as_ref(), &entries)
            .await
            .map_err(PublishError::write(Stage::CreateTree, None))?;

        let parents: Vec<ObjectId> = baseline.cloned().into_iter().collect();
        let revision = self
            .store
            .create_revision(message, &tree, &parents)
            .await
            .map_err(PublishError::write(Stage::CreateRevision, None))?;

        self.advance(branch, baseline, &revision).await?;
        info!(
            branch,
            revision = %revision.id,
            files = files.len(),
            "branch advanced"
        );
        Ok(revision)
    }

    async fn advance(
        &self,
        branch: &str,
        baseline: Option<&ObjectId>,
        revision: &Revision,
    ) -> Result<(), PublishError> {
        match self
            .store
            .update_branch(branch, baseline, &revision.id)
            .await
        {
            Ok(CasOutcome::Updated) => Ok(()),
            Ok(CasOutcome::Conflict { actual }) => {
                warn!(
                    branch,
                    expected = baseline.map(ObjectId::short),
                    actual = actual.as_ref().map(ObjectId::short),
                    "branch moved during publish"
                );
                Err(PublishError::Conflict {
                    branch: branch.to_string(),
                    expected: baseline.cloned(),
                    actual,
                })
            }
            Err(err) if err.is_indeterminate() => self.confirm(branch, revision, err).await,
            Err(err) => Err(PublishError::write(Stage::UpdateBranch, None)(err)),
        }
    }

    /// The update request may or may not have been applied. Re-read the tip
    /// once to find out.
    async fn confirm(
        &self,
        branch: &str,
        revision: &Revision,
        err: StoreError,
    ) -> Result<(), PublishError> {
        warn!(branch, revision = %revision.id, error = %err, "branch update outcome unknown, re-reading tip");
        match self.store.read_branch(branch).await {
            Ok(Some(tip)) if tip == revision.id => {
                info!(branch, revision = %revision.id, "branch update confirmed");
                Ok(())
            }
            Ok(_) => Err(PublishError::write(Stage::UpdateBranch, None)(err)),
            Err(read_err) => {
                warn!(branch, error = %read_err, "could not verify branch tip");
                Err(PublishError::Unconfirmed {
                    branch: branch.to_string(),
                    revision: revision.id.clone(),
                    source: err,
                })
            }
        }
    }
}

fn check_files(files: &[FileChange]) -> Result<(), ValidationError> {
    if files.is_empty() {
        return Err(ValidationError::EmptyFileSet);
    }
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        validate_repo_path(&file.path)?;
        if !seen.insert(file.path.as_str()) {
            return Err(ValidationError::DuplicatePath(file.path.clone()));
        }
    }
    Ok(())
}
