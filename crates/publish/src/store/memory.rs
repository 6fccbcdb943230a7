//! In-memory object store.
//!
//! Backs the `memory` publish backend (local dry runs) and the test suites.
//! Objects are addressed by SHA-256 of their content; branch updates are a
//! real compare-and-swap under a single write lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::{CasOutcome, ObjectId, ObjectStore, Revision, TreeEntry};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct StoredRevision {
    tree: ObjectId,
    parents: Vec<ObjectId>,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    blobs: HashMap<ObjectId, Vec<u8>>,
    trees: HashMap<ObjectId, BTreeMap<String, ObjectId>>,
    revisions: HashMap<ObjectId, StoredRevision>,
    branches: HashMap<String, ObjectId>,
}

/// Thread-safe in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryStore")
            .field("blob_count", &state.blobs.len())
            .field("tree_count", &state.trees.len())
            .field("revision_count", &state.revisions.len())
            .field("branch_count", &state.branches.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tip of `branch`.
    pub fn branch_tip(&self, branch: &str) -> Option<ObjectId> {
        self.state.read().branches.get(branch).cloned()
    }

    /// Point `branch` at `revision` unconditionally, the way an unrelated
    /// writer would.
    pub fn force_branch(&self, branch: &str, revision: &ObjectId) {
        self.state
            .write()
            .branches
            .insert(branch.to_string(), revision.clone());
    }

    /// Write text `files` as a new revision on top of `branch` and advance
    /// it. Convenience for seeding a repository.
    pub fn seed(&self, branch: &str, files: &[(&str, &str)], message: &str) -> ObjectId {
        let mut state = self.state.write();
        let parent = state.branches.get(branch).cloned();
        let mut tree = parent
            .as_ref()
            .and_then(|p| state.revisions.get(p))
            .and_then(|r| state.trees.get(&r.tree))
            .cloned()
            .unwrap_or_default();
        for (path, bytes) in files {
            let blob = blob_id(bytes.as_bytes());
            state.blobs.insert(blob.clone(), bytes.as_bytes().to_vec());
            tree.insert((*path).to_string(), blob);
        }
        let tree_id = tree_id(&tree);
        state.trees.insert(tree_id.clone(), tree);

        let parents: Vec<ObjectId> = parent.into_iter().collect();
        let id = revision_id(&tree_id, &parents, message);
        state.revisions.insert(
            id.clone(),
            StoredRevision {
                tree: tree_id,
                parents,
                message: message.to_string(),
            },
        );
        state.branches.insert(branch.to_string(), id.clone());
        id
    }

    /// File content at `path` in `revision`.
    pub fn read_file(&self, revision: &ObjectId, path: &str) -> Option<Vec<u8>> {
        let state = self.state.read();
        let tree = state.trees.get(&state.revisions.get(revision)?.tree)?;
        state.blobs.get(tree.get(path)?).cloned()
    }

    /// All paths in `revision`'s tree, sorted.
    pub fn paths(&self, revision: &ObjectId) -> Vec<String> {
        let state = self.state.read();
        state
            .revisions
            .get(revision)
            .and_then(|r| state.trees.get(&r.tree))
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn parents(&self, revision: &ObjectId) -> Vec<ObjectId> {
        self.state
            .read()
            .revisions
            .get(revision)
            .map(|r| r.parents.clone())
            .unwrap_or_default()
    }

    pub fn message(&self, revision: &ObjectId) -> Option<String> {
        self.state
            .read()
            .revisions
            .get(revision)
            .map(|r| r.message.clone())
    }

    pub fn blob_count(&self) -> usize {
        self.state.read().blobs.len()
    }

    pub fn revision_count(&self) -> usize {
        self.state.read().revisions.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn read_branch(&self, branch: &str) -> StoreResult<Option<ObjectId>> {
        Ok(self.branch_tip(branch))
    }

    async fn read_revision(&self, id: &ObjectId) -> StoreResult<Revision> {
        let state = self.state.read();
        let stored = state
            .revisions
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("revision {id}")))?;
        Ok(Revision {
            id: id.clone(),
            tree: stored.tree.clone(),
            url: None,
        })
    }

    async fn create_blob(&self, bytes: &[u8]) -> StoreResult<ObjectId> {
        let id = blob_id(bytes);
        self.state
            .write()
            .blobs
            .entry(id.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(id)
    }

    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> StoreResult<ObjectId> {
        let mut state = self.state.write();
        let mut tree = match base {
            Some(base) => state
                .trees
                .get(base)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("tree {base}")))?,
            None => BTreeMap::new(),
        };
        for entry in entries {
            if !state.blobs.contains_key(&entry.blob) {
                return Err(StoreError::NotFound(format!("blob {}", entry.blob)));
            }
            tree.insert(entry.path.clone(), entry.blob.clone());
        }
        let id = tree_id(&tree);
        state.trees.insert(id.clone(), tree);
        Ok(id)
    }

    async fn create_revision(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> StoreResult<Revision> {
        let mut state = self.state.write();
        if !state.trees.contains_key(tree) {
            return Err(StoreError::NotFound(format!("tree {tree}")));
        }
        if let Some(missing) = parents.iter().find(|p| !state.revisions.contains_key(*p)) {
            return Err(StoreError::NotFound(format!("revision {missing}")));
        }
        let id = revision_id(tree, parents, message);
        state.revisions.insert(
            id.clone(),
            StoredRevision {
                tree: tree.clone(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        Ok(Revision {
            id,
            tree: tree.clone(),
            url: None,
        })
    }

    async fn update_branch(
        &self,
        branch: &str,
        expected: Option<&ObjectId>,
        new: &ObjectId,
    ) -> StoreResult<CasOutcome> {
        let mut state = self.state.write();
        if !state.revisions.contains_key(new) {
            return Err(StoreError::NotFound(format!("revision {new}")));
        }
        let current = state.branches.get(branch);
        if current != expected {
            return Ok(CasOutcome::Conflict {
                actual: current.cloned(),
            });
        }
        state.branches.insert(branch.to_string(), new.clone());
        Ok(CasOutcome::Updated)
    }
}

fn hash(kind: &str, parts: &[&[u8]]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    ObjectId::new(hex::encode(hasher.finalize()))
}

fn blob_id(bytes: &[u8]) -> ObjectId {
    hash("blob", &[bytes])
}

fn tree_id(tree: &BTreeMap<String, ObjectId>) -> ObjectId {
    let parts: Vec<&[u8]> = tree
        .iter()
        .flat_map(|(path, blob)| [path.as_bytes(), blob.as_str().as_bytes()])
        .collect();
    hash("tree", &parts)
}

fn revision_id(tree: &ObjectId, parents: &[ObjectId], message: &str) -> ObjectId {
    let mut parts: Vec<&[u8]> = vec![tree.as_str().as_bytes(), message.as_bytes()];
    parts.extend(parents.iter().map(|p| p.as_str().as_bytes()));
    hash("revision", &parts)
}
