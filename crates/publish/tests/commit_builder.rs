mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::Interfering;
use sitepress_publish::{CommitBuilder, FileChange, MemoryStore, PublishError, Stage};

fn files() -> Vec<FileChange> {
    vec![
        FileChange::new("a.png", vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]),
        FileChange::new("content.json", b"{\"version\":1}".to_vec()),
    ]
}

#[tokio::test]
async fn commit_lands_all_files_in_one_revision() {
    let store = MemoryStore::new();
    let baseline = store.seed("main", &[("index.html", "<html>"), ("content.json", "{}")], "init");
    let builder = CommitBuilder::new(Arc::new(store.clone()));

    let revision = builder.commit("main", &files(), "Publish content").await.unwrap();

    assert_eq!(store.branch_tip("main"), Some(revision.id.clone()));
    assert_eq!(store.parents(&revision.id), [baseline]);
    assert_eq!(
        store.read_file(&revision.id, "a.png").unwrap(),
        vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]
    );
    assert_eq!(
        store.read_file(&revision.id, "content.json").unwrap(),
        b"{\"version\":1}"
    );
    // Files not in the change set survive the overlay.
    assert_eq!(store.read_file(&revision.id, "index.html").unwrap(), b"<html>");
    assert_eq!(store.paths(&revision.id), ["a.png", "content.json", "index.html"]);
}

#[tokio::test]
async fn concurrent_advance_is_a_conflict_not_an_overwrite() {
    let store = Arc::new(Interfering::default());
    let baseline = store.inner.seed("main", &[("content.json", "{}")], "init");
    store.race_next.store(1, Ordering::SeqCst);
    let builder = CommitBuilder::new(store.clone());

    let err = builder.commit("main", &files(), "Publish content").await.unwrap_err();

    let external = store.inner.branch_tip("main").unwrap();
    assert_ne!(external, baseline);
    match err {
        PublishError::Conflict {
            branch,
            expected,
            actual,
        } => {
            assert_eq!(branch, "main");
            assert_eq!(expected, Some(baseline));
            assert_eq!(actual, Some(external.clone()));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    // The external edit is still the tip and did not get our files.
    assert_eq!(store.inner.read_file(&external, "a.png"), None);
    assert_eq!(
        store.inner.read_file(&external, "index.html").unwrap(),
        b"edited elsewhere"
    );
}

#[tokio::test]
async fn stale_baseline_is_rejected() {
    let store = MemoryStore::new();
    let r = store.seed("main", &[("content.json", "{}")], "one");
    let r_prime = store.seed("main", &[("content.json", "{\"v\":2}")], "two");
    let builder = CommitBuilder::new(Arc::new(store.clone()));

    let err = builder
        .commit_onto("main", Some(&r), &files(), "Publish content")
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(store.branch_tip("main"), Some(r_prime));
}

#[tokio::test]
async fn failed_write_leaves_branch_untouched() {
    let store = Arc::new(Interfering::default());
    let baseline = store.inner.seed("main", &[("content.json", "{}")], "init");
    store.fail_blob.store(2, Ordering::SeqCst);
    let builder = CommitBuilder::new(store.clone()).with_concurrency(1);

    let err = builder.commit("main", &files(), "Publish content").await.unwrap_err();

    match &err {
        PublishError::RemoteWrite { stage, path, .. } => {
            assert_eq!(*stage, Stage::CreateBlob);
            assert_eq!(path.as_deref(), Some("content.json"));
        }
        other => panic!("expected remote write error, got {other:?}"),
    }
    assert_eq!(store.inner.branch_tip("main"), Some(baseline));
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identical_bytes_share_one_object() {
    let store = MemoryStore::new();
    let builder = CommitBuilder::new(Arc::new(store.clone()));
    let before = store.blob_count();

    builder
        .commit(
            "main",
            &[
                FileChange::new("a.png", b"same".to_vec()),
                FileChange::new("b.png", b"same".to_vec()),
            ],
            "dup",
        )
        .await
        .unwrap();

    assert_eq!(store.blob_count(), before + 1);
}

#[tokio::test]
async fn concurrent_publishes_never_lose_a_revision() {
    let store = MemoryStore::new();
    store.seed("main", &[("content.json", "{}")], "init");
    let builder = CommitBuilder::new(Arc::new(store.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let builder = builder.clone();
        handles.push(tokio::spawn(async move {
            builder
                .commit(
                    "main",
                    &[FileChange::new(format!("p{i}.txt"), format!("{i}").into_bytes())],
                    &format!("publish {i}"),
                )
                .await
        }));
    }

    let mut landed = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(revision) => landed.push(revision.id),
            Err(err) => assert!(err.is_retryable(), "unexpected error: {err}"),
        }
    }

    // Every successful revision is an ancestor of (or is) the final tip.
    let mut chain = Vec::new();
    let mut cursor = store.branch_tip("main");
    while let Some(id) = cursor {
        cursor = store.parents(&id).into_iter().next();
        chain.push(id);
    }
    assert!(!landed.is_empty());
    for id in &landed {
        assert!(chain.contains(id), "revision {id} was overwritten");
    }
}
