//! Feature collections with optimistic concurrency.

mod support;

use std::time::Duration;

use chrono::NaiveDate;
use pocket_domain::keys::feature_key;
use pocket_domain::{
    AttendanceRecord, AttendanceStatus, Feature, GradeRecord, JournalEntry, Note, PocketError,
};
use serde_json::json;
use support::Harness;
use uuid::Uuid;

#[tokio::test]
async fn add_list_update_remove() {
    let h = Harness::new();
    let note = h.data.add("alice", Note::new("Chem", "Moles")).await.unwrap();
    assert_eq!(note.created_at, note.updated_at);

    h.clock.advance(Duration::from_secs(60));
    let mut edited = note.clone();
    edited.content = "Moles and molarity".into();
    edited.created_at = edited.created_at - chrono::Duration::days(30);
    let updated = h.data.update("alice", edited).await.unwrap();

    assert_eq!(updated.created_at, note.created_at);
    assert!(updated.updated_at > note.updated_at);
    let notes = h.data.list::<Note>("alice").await.unwrap();
    assert_eq!(notes, vec![updated.clone()]);
    assert_eq!(h.data.get::<Note>("alice", note.id).await.unwrap(), Some(updated));

    let removed = h.data.remove::<Note>("alice", note.id).await.unwrap();
    assert_eq!(removed.map(|n| n.id), Some(note.id));
    assert!(h.data.list::<Note>("alice").await.unwrap().is_empty());
    assert!(h.data.remove::<Note>("alice", note.id).await.unwrap().is_none());
}

#[tokio::test]
async fn features_live_under_separate_keys() {
    let h = Harness::new();
    h.data.add("bob", GradeRecord::new("MATH101", "Final", 88.0, 100.0)).await.unwrap();
    h.data
        .add(
            "bob",
            AttendanceRecord::new(
                "MATH101",
                NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
                AttendanceStatus::Present,
            ),
        )
        .await
        .unwrap();

    let keys = h.kv.keys();
    assert!(keys.contains(&feature_key("bob", Feature::Grades)));
    assert!(keys.contains(&feature_key("bob", Feature::Attendance)));

    assert!(h.data.clear::<GradeRecord>("bob").await.unwrap());
    assert!(h.data.list::<GradeRecord>("bob").await.unwrap().is_empty());
    assert_eq!(h.data.list::<AttendanceRecord>("bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let h = Harness::new();
    let result = h.data.update("carol", JournalEntry::new("Day 1", "...")).await;
    assert!(matches!(result, Err(PocketError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let h = Harness::new();
    let note = h.data.add("dana", Note::new("a", "b")).await.unwrap();
    let result = h.data.add("dana", note).await;
    assert!(matches!(result, Err(PocketError::Conflict(_))));
}

#[tokio::test]
async fn version_conflicts_are_retried() {
    let h = Harness::new();
    h.kv.inject_conflicts(3);

    h.data.add("erin", Note::new("retry", "me")).await.unwrap();

    assert_eq!(h.data.list::<Note>("erin").await.unwrap().len(), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_a_conflict() {
    let h = Harness::new();
    h.kv.inject_conflicts(h.config.security.update_retries);

    let result = h.data.add("finn", Note::new("lost", "update")).await;

    assert!(matches!(result, Err(PocketError::Conflict(_))));
    assert!(h.data.list::<Note>("finn").await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_writers_do_not_lose_updates() {
    let h = std::sync::Arc::new(Harness::new());
    let mut tasks = Vec::new();
    for i in 0..4 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.data.add("gail", Note::new(format!("note {i}"), "")).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(h.data.list::<Note>("gail").await.unwrap().len(), 4);
}

#[tokio::test]
async fn malformed_collection_is_a_serialization_error() {
    let h = Harness::new();
    h.kv.raw_put(
        &feature_key("hank", Feature::Notes),
        json!({ "items": [{ "id": Uuid::nil(), "title": 7 }] }),
    );

    let result = h.data.list::<Note>("hank").await;

    assert!(matches!(result, Err(PocketError::Serialization(_))));
}
