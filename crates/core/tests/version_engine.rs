//! Integration tests for the version engine over the in-memory store.
//!
//! Exercises:
//! - Sequence 1 created with the template
//! - Snapshot-before-mutate on update
//! - Restore is additive and copies content byte-for-byte
//! - Ownership checks on snapshot lookups
//! - Gap-free sequences under concurrent updates and restores
//! - Full rollback when a step of the unit of work fails

use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Utc;
use promptvault_core::diff::DiffKind;
use promptvault_core::error::CoreError;
use promptvault_core::memory::{FailurePoint, MemoryStore};
use promptvault_core::snapshot::SnapshotOrigin;
use promptvault_core::store::{TemplateRecord, UnitOfWork, VersionStore};
use promptvault_core::template::{NewTemplate, TemplateChanges, TemplateContent};
use promptvault_core::versioning::VersionEngine;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine() -> VersionEngine<MemoryStore> {
    VersionEngine::new(MemoryStore::new())
}

fn new_template(title: &str, body: &str) -> NewTemplate {
    NewTemplate {
        vault_id: 1,
        title: title.to_string(),
        description: Some("demo".to_string()),
        body: body.to_string(),
    }
}

fn body_change(body: &str) -> TemplateChanges {
    TemplateChanges {
        body: Some(body.to_string()),
        ..Default::default()
    }
}

fn sequences(versions: &[promptvault_core::snapshot::Snapshot]) -> Vec<i32> {
    versions.iter().map(|v| v.sequence).collect()
}

// ---------------------------------------------------------------------------
// Test: create -> edit -> restore scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_edit_restore_scenario() {
    let engine = engine();

    let template = engine
        .create_template(&new_template("Greeting", "Hello {{name}}"))
        .await
        .unwrap();
    let versions = engine.list_versions(template.id).await.unwrap();
    assert_eq!(sequences(&versions), vec![1]);
    assert_eq!(versions[0].body, "Hello {{name}}");
    assert_eq!(versions[0].origin, SnapshotOrigin::Created);
    let first = versions[0].id;

    let edited = engine
        .update_template(template.id, &body_change("Hello {{name}}!!"))
        .await
        .unwrap();
    assert_eq!(edited.body, "Hello {{name}}!!");
    let versions = engine.list_versions(template.id).await.unwrap();
    assert_eq!(sequences(&versions), vec![2, 1]);
    assert_eq!(versions[0].body, "Hello {{name}}");
    assert_eq!(versions[0].origin, SnapshotOrigin::Edited);

    let restored = engine.restore(template.id, first).await.unwrap();
    assert_eq!(restored.body, "Hello {{name}}");
    let versions = engine.list_versions(template.id).await.unwrap();
    assert_eq!(sequences(&versions), vec![3, 2, 1]);
    assert_eq!(versions[0].body, "Hello {{name}}!!");
    assert_eq!(
        versions[0].origin,
        SnapshotOrigin::Restored { from_sequence: 1 }
    );
}

// ---------------------------------------------------------------------------
// Test: restore properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restore_adds_exactly_one_snapshot_with_pre_restore_state() {
    let engine = engine();
    let template = engine
        .create_template(&new_template("T", "v1"))
        .await
        .unwrap();
    engine
        .update_template(
            template.id,
            &TemplateChanges {
                title: Some("T2".into()),
                description: Some("second".into()),
                body: Some("v2\nline".into()),
            },
        )
        .await
        .unwrap();

    let before = engine.list_versions(template.id).await.unwrap();
    let target = before.last().unwrap().clone();
    let current = engine.get_template(template.id).await.unwrap();

    let restored = engine.restore(template.id, target.id).await.unwrap();

    let after = engine.list_versions(template.id).await.unwrap();
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after[0].content(), current.content());

    assert_eq!(restored.content(), target.content());
    assert_eq!(restored.id, current.id);
    assert_eq!(restored.created_at, current.created_at);
    assert!(restored.updated_at >= current.updated_at);
}

#[tokio::test]
async fn restore_keeps_every_existing_snapshot() {
    let engine = engine();
    let template = engine
        .create_template(&new_template("T", "a"))
        .await
        .unwrap();
    for body in ["b", "c", "d"] {
        engine
            .update_template(template.id, &body_change(body))
            .await
            .unwrap();
    }
    let before = engine.list_versions(template.id).await.unwrap();
    let middle = before.iter().find(|v| v.sequence == 2).unwrap().id;

    engine.restore(template.id, middle).await.unwrap();

    let after = engine.list_versions(template.id).await.unwrap();
    assert_eq!(&after[1..], &before[..]);
}

#[tokio::test]
async fn restore_unknown_template_or_snapshot_is_not_found() {
    let engine = engine();
    let template = engine
        .create_template(&new_template("T", "a"))
        .await
        .unwrap();

    assert_matches!(
        engine.restore(999, 1).await,
        Err(CoreError::NotFound {
            entity: "Template",
            id: 999
        })
    );
    assert_matches!(
        engine.restore(template.id, 999).await,
        Err(CoreError::NotFound {
            entity: "Snapshot",
            id: 999
        })
    );
}

#[tokio::test]
async fn restore_of_template_without_history_is_a_storage_failure() {
    let store = MemoryStore::new();
    let mut uow = store.begin().await.unwrap();
    let bare = uow
        .insert_template(&TemplateRecord {
            vault_id: 1,
            content: TemplateContent {
                title: "Bare".into(),
                description: String::new(),
                body: "no history".into(),
            },
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let engine = VersionEngine::new(store.clone());
    assert_matches!(
        engine.restore(bare.id, 1).await,
        Err(CoreError::Storage(_))
    );
    assert_eq!(engine.get_template(bare.id).await.unwrap().body, "no history");
    assert_eq!(store.snapshot_total().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Test: ownership is checked on lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn foreign_snapshot_is_never_returned() {
    let engine = engine();
    let a = engine
        .create_template(&new_template("A", "a"))
        .await
        .unwrap();
    let b = engine
        .create_template(&new_template("B", "b"))
        .await
        .unwrap();
    let b_snapshot = engine.list_versions(b.id).await.unwrap()[0].id;

    assert_matches!(
        engine.get_version(a.id, b_snapshot).await,
        Err(CoreError::NotFound { entity: "Snapshot", .. })
    );
    assert_matches!(
        engine.restore(a.id, b_snapshot).await,
        Err(CoreError::NotFound { entity: "Snapshot", .. })
    );
    assert_eq!(engine.version_count(a.id).await.unwrap(), 1);
    assert_eq!(engine.get_template(a.id).await.unwrap().body, "a");
}

#[tokio::test]
async fn get_version_returns_owned_snapshot() {
    let engine = engine();
    let t = engine
        .create_template(&new_template("T", "x"))
        .await
        .unwrap();
    let listed = engine.list_versions(t.id).await.unwrap();
    let fetched = engine.get_version(t.id, listed[0].id).await.unwrap();
    assert_eq!(fetched, listed[0]);
}

#[tokio::test]
async fn list_versions_of_missing_template_is_not_found() {
    assert_matches!(
        engine().list_versions(42).await,
        Err(CoreError::NotFound { entity: "Template", id: 42 })
    );
}

// ---------------------------------------------------------------------------
// Test: update validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_update_creates_no_snapshot() {
    let engine = engine();
    let t = engine
        .create_template(&new_template("T", "x"))
        .await
        .unwrap();

    let blank_title = TemplateChanges {
        title: Some("   ".into()),
        ..Default::default()
    };
    assert_matches!(
        engine.update_template(t.id, &blank_title).await,
        Err(CoreError::Validation(_))
    );
    assert_matches!(
        engine.update_template(t.id, &TemplateChanges::default()).await,
        Err(CoreError::Validation(_))
    );
    assert_eq!(engine.version_count(t.id).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Test: concurrent updates keep sequences gap-free
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_produce_gap_free_sequences() {
    let engine = Arc::new(engine());
    let template = engine
        .create_template(&new_template("T", "0"))
        .await
        .unwrap();
    let other = engine
        .create_template(&new_template("O", "0"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 1..=24 {
        let engine = Arc::clone(&engine);
        let target = if i % 4 == 0 { other.id } else { template.id };
        handles.push(tokio::spawn(async move {
            engine
                .update_template(target, &body_change(&i.to_string()))
                .await
        }));
    }
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let mut seqs = sequences(&engine.list_versions(template.id).await.unwrap());
    seqs.reverse();
    assert_eq!(seqs, (1..=19).collect::<Vec<_>>());

    let mut other_seqs = sequences(&engine.list_versions(other.id).await.unwrap());
    other_seqs.reverse();
    assert_eq!(other_seqs, (1..=7).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_snapshot_pairs_with_one_prior_state() {
    let engine = Arc::new(engine());
    let template = engine
        .create_template(&new_template("T", "start"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .update_template(template.id, &body_change(&format!("body-{i}")))
                .await
        }));
    }
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let mut versions = engine.list_versions(template.id).await.unwrap();
    versions.reverse();
    let current = engine.get_template(template.id).await.unwrap();

    // Sequences 1 and 2 both hold the starting body; every later snapshot and
    // the current body each hold exactly one written body.
    assert_eq!(versions[1].body, "start");
    let mut bodies: Vec<&str> = versions[2..].iter().map(|v| v.body.as_str()).collect();
    bodies.push(current.body.as_str());
    bodies.sort_unstable();
    let mut expected: Vec<String> = (0..10).map(|i| format!("body-{i}")).collect();
    expected.sort_unstable();
    assert_eq!(bodies, expected);
    assert_eq!(versions[0].body, "start");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_restores_and_updates_produce_gap_free_sequences() {
    let engine = Arc::new(engine());
    let template = engine
        .create_template(&new_template("T", "v1"))
        .await
        .unwrap();
    engine
        .update_template(template.id, &body_change("v2"))
        .await
        .unwrap();
    let first = engine.list_versions(template.id).await.unwrap()[1].id;

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = Arc::clone(&engine);
        let template_id = template.id;
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.restore(template_id, first).await
            } else {
                engine
                    .update_template(template_id, &body_change(&format!("edit-{i}")))
                    .await
            }
        }));
    }
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    // One creation snapshot, one for the setup update, one per concurrent call.
    let versions = engine.list_versions(template.id).await.unwrap();
    assert_eq!(versions.len(), 1 + 1 + 16);
    let mut seqs = sequences(&versions);
    seqs.reverse();
    assert_eq!(seqs, (1..=18).collect::<Vec<_>>());

    let restores = versions
        .iter()
        .filter(|v| v.origin == SnapshotOrigin::Restored { from_sequence: 1 })
        .count();
    assert_eq!(restores, 8);
    assert_eq!(engine.version_count(template.id).await.unwrap(), 18);
}

// ---------------------------------------------------------------------------
// Test: failed steps roll back completely
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_save_discards_the_snapshot() {
    let store = MemoryStore::new();
    let engine = VersionEngine::new(store.clone());
    let t = engine
        .create_template(&new_template("T", "orig"))
        .await
        .unwrap();

    store.inject_failure(FailurePoint::SaveTemplate);
    let err = engine
        .update_template(t.id, &body_change("changed"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    assert_eq!(engine.version_count(t.id).await.unwrap(), 1);
    assert_eq!(engine.get_template(t.id).await.unwrap().body, "orig");

    // The lock was released and a retry succeeds with the next sequence.
    engine
        .update_template(t.id, &body_change("changed"))
        .await
        .unwrap();
    let versions = engine.list_versions(t.id).await.unwrap();
    assert_eq!(sequences(&versions), vec![2, 1]);
}

#[tokio::test]
async fn failed_commit_during_restore_leaves_state_untouched() {
    let store = MemoryStore::new();
    let engine = VersionEngine::new(store.clone());
    let t = engine
        .create_template(&new_template("T", "v1"))
        .await
        .unwrap();
    engine
        .update_template(t.id, &body_change("v2"))
        .await
        .unwrap();
    let first = engine.list_versions(t.id).await.unwrap()[1].id;

    store.inject_failure(FailurePoint::Commit);
    assert_matches!(engine.restore(t.id, first).await, Err(CoreError::Storage(_)));

    assert_eq!(engine.version_count(t.id).await.unwrap(), 2);
    assert_eq!(engine.get_template(t.id).await.unwrap().body, "v2");
}

#[tokio::test]
async fn failed_initial_snapshot_discards_the_template() {
    let store = MemoryStore::new();
    let engine = VersionEngine::new(store.clone());

    store.inject_failure(FailurePoint::InsertSnapshot);
    assert_matches!(
        engine.create_template(&new_template("T", "x")).await,
        Err(CoreError::Storage(_))
    );
    assert_eq!(store.snapshot_total().unwrap(), 0);

    let t = engine
        .create_template(&new_template("T", "x"))
        .await
        .unwrap();
    assert_matches!(engine.get_template(t.id - 1).await, Err(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Test: delete cascades
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_template_and_history() {
    let store = MemoryStore::new();
    let engine = VersionEngine::new(store.clone());
    let t = engine
        .create_template(&new_template("T", "x"))
        .await
        .unwrap();
    engine
        .update_template(t.id, &body_change("y"))
        .await
        .unwrap();

    engine.delete_template(t.id).await.unwrap();

    assert_matches!(engine.list_versions(t.id).await, Err(CoreError::NotFound { .. }));
    assert_eq!(store.snapshot_total().unwrap(), 0);
    assert_matches!(engine.delete_template(t.id).await, Err(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Test: caller-facing read helpers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn compare_versions_diffs_snapshot_bodies() {
    let engine = engine();
    let t = engine
        .create_template(&new_template("T", "a\nb\nc"))
        .await
        .unwrap();
    engine
        .update_template(t.id, &body_change("a\nx\nc"))
        .await
        .unwrap();
    engine
        .update_template(t.id, &body_change("done"))
        .await
        .unwrap();

    let versions = engine.list_versions(t.id).await.unwrap();
    // Sequence 1 is the created body, sequence 3 the body before "done".
    let (older, newer) = (versions[2].id, versions[0].id);
    let comparison = engine.compare_versions(t.id, older, newer).await.unwrap();

    let kinds: Vec<(DiffKind, &str)> = comparison
        .lines
        .iter()
        .map(|l| (l.kind, l.line.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (DiffKind::Same, "a"),
            (DiffKind::Removed, "b"),
            (DiffKind::Added, "x"),
            (DiffKind::Same, "c"),
        ]
    );
    assert_eq!(comparison.summary.added, 1);
    assert_eq!(comparison.summary.removed, 1);
}

#[tokio::test]
async fn render_template_resolves_and_validates() {
    let engine = engine();
    let t = engine
        .create_template(&new_template("T", "Hi {{name}}, {{age}}"))
        .await
        .unwrap();

    let values = HashMap::from([("name".to_string(), "Ada".to_string())]);
    let rendered = engine.render_template(t.id, &values).await.unwrap();

    assert_eq!(rendered.resolved_body, "Hi Ada, {{age}}");
    assert!(!rendered.validation.complete);
    assert_eq!(rendered.validation.missing, vec!["age"]);
}
