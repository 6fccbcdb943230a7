//! Atomic publishing of a content document to a Git object store.
//!
//! The pipeline is normalize → extract assets → one commit that carries every
//! asset together with `content.json`. The branch only moves through a
//! compare-and-swap against the tip captured at the start of the commit, so a
//! concurrent writer causes a [`PublishError::Conflict`] instead of a silent
//! overwrite.

pub mod commit;
pub mod error;
pub mod pipeline;
pub mod store;

pub use commit::{CommitBuilder, FileChange};
pub use error::{PublishError, Stage, StoreError, StoreResult};
pub use pipeline::{PublishOutcome, Publisher, PublisherConfig};
pub use store::github::{GitHubConfig, GitHubStore, RepositoryInfo};
pub use store::memory::MemoryStore;
pub use store::{CasOutcome, ObjectId, ObjectStore, Revision, TreeEntry};
