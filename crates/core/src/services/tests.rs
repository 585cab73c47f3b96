use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::memory::MemoryStore;
use crate::model::fixtures::{item, project};
use crate::model::{ItemPatch, ItemStatus, NewItem, NewProject, ProjectColor};
use crate::records::RecordSet;
use crate::store::StaticAuth;

fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_records(RecordSet {
        items: vec![item("a", None, 1), item("b", None, 2)],
        projects: vec![project("p1", 1)],
    }))
}

fn tracker_over(store: Arc<MemoryStore>) -> Tracker {
    Tracker::new(store, Arc::new(StaticAuth::signed_in("user-1")))
}

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[tokio::test]
async fn refresh_loads_both_collections() {
    let tracker = tracker_over(seeded_store());
    tracker.refresh().await.unwrap();
    assert_eq!(ids(&tracker.items()), vec!["a", "b"]);
    assert_eq!(tracker.projects().len(), 1);
    assert!(!tracker.item_cache().is_stale());
    assert!(tracker.item_cache().is_loaded());
}

#[tokio::test]
async fn created_item_is_visible_before_the_store_answers() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(30)));
    let tracker = tracker_over(store);

    let (created, seen) = tokio::join!(tracker.create_item(NewItem::titled("  Buy milk ")), async {
        tracker.items()
    });

    assert_eq!(seen.len(), 1);
    assert!(is_temp_id(&seen[0].id));
    assert_eq!(seen[0].title, "Buy milk");
    assert_eq!(seen[0].status, ItemStatus::Todo);
    assert_eq!(seen[0].position, 1);

    let created = created.unwrap();
    assert!(!is_temp_id(&created.id));
    assert_eq!(ids(&tracker.items()), vec![created.id.as_str()]);
}

#[tokio::test]
async fn failed_create_restores_previous_cache_exactly() {
    let store = seeded_store();
    let tracker = tracker_over(store.clone());
    tracker.refresh().await.unwrap();
    let before = tracker.items();

    store.fail_next_write();
    let err = tracker
        .create_item(NewItem::titled("doomed"))
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(err.to_string(), "Failed to create items: create item rejected by store");
    assert_eq!(tracker.items(), before);
}

#[tokio::test]
async fn failed_write_still_refetches() {
    let store = seeded_store();
    let tracker = tracker_over(store.clone());
    tracker.refresh().await.unwrap();
    let calls = store.list_calls();

    store.fail_next_write();
    assert!(tracker
        .update_item("a", ItemPatch::title("renamed"))
        .await
        .is_err());

    assert_eq!(store.list_calls(), calls + 1);
    assert_eq!(tracker.item("a").await.unwrap().unwrap().title, "Item a");
    assert!(!tracker.item_cache().is_stale());
}

#[tokio::test]
async fn status_update_keeps_completion_in_step() {
    let tracker = tracker_over(seeded_store());
    tracker.refresh().await.unwrap();

    let done = tracker
        .update_item("a", ItemPatch::status(ItemStatus::Done))
        .await
        .unwrap();
    let stamped = done.completed_at.expect("completed_at set on done");

    let again = tracker
        .update_item("a", ItemPatch::status(ItemStatus::Done))
        .await
        .unwrap();
    assert_eq!(again.completed_at, Some(stamped));

    let reopened = tracker
        .update_item("a", ItemPatch::status(ItemStatus::InProgress))
        .await
        .unwrap();
    assert_eq!(reopened.completed_at, None);
    assert_eq!(tracker.item_cache().get("a").unwrap().completed_at, None);
}

#[tokio::test]
async fn signed_out_writes_touch_nothing() {
    let store = seeded_store();
    let tracker = Tracker::new(store.clone(), Arc::new(StaticAuth::signed_out()));
    let version = tracker.item_cache().version();

    let err = tracker
        .create_item(NewItem::titled("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Unauthenticated));
    assert!(matches!(
        tracker.delete_project("p1").await,
        Err(MutationError::Unauthenticated)
    ));

    assert_eq!(tracker.item_cache().version(), version);
    assert!(tracker.items().is_empty());
    assert_eq!(store.snapshot().items.len(), 2);
    assert_eq!(store.list_calls(), 0);
}

#[tokio::test]
async fn blank_title_is_rejected_before_apply() {
    let tracker = tracker_over(seeded_store());
    tracker.refresh().await.unwrap();
    let version = tracker.item_cache().version();

    let err = tracker.create_item(NewItem::titled("   ")).await.unwrap_err();
    assert!(matches!(err, MutationError::EmptyTitle));
    let err = tracker
        .update_item("a", ItemPatch::title(""))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::EmptyTitle));
    assert_eq!(tracker.item_cache().version(), version);
}

#[tokio::test]
async fn write_cancels_outstanding_refetch() {
    let store = Arc::new(
        MemoryStore::from_records(RecordSet {
            items: vec![item("a", None, 1)],
            projects: vec![],
        })
        .with_latency(Duration::from_millis(20)),
    );
    let tracker = tracker_over(store);

    let (outcome, updated) = tokio::join!(
        tracker.refresh_items(),
        tracker.update_item("a", ItemPatch::title("renamed"))
    );

    assert_eq!(outcome.unwrap(), RefetchOutcome::Cancelled);
    assert_eq!(updated.unwrap().title, "renamed");
    assert_eq!(tracker.item_cache().get("a").unwrap().title, "renamed");
}

#[tokio::test]
async fn concurrent_creates_are_both_kept() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(10)));
    let tracker = tracker_over(store.clone());

    let (first, second) = tokio::join!(
        tracker.create_item(NewItem::titled("first")),
        tracker.create_item(NewItem::titled("second"))
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    let items = tracker.items();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| !is_temp_id(&item.id)));
    assert!(items.iter().any(|item| item.id == first.id));
    assert!(items.iter().any(|item| item.id == second.id));
    assert_eq!(tracker.item_cache().in_flight(), 0);
    // Only the last write to settle reloads the list.
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test]
async fn delete_removes_item_and_descendants_after_settle() {
    let store = Arc::new(MemoryStore::from_records(RecordSet {
        items: vec![item("a", None, 1), item("a1", Some("a"), 1), item("b", None, 2)],
        projects: vec![],
    }));
    let tracker = tracker_over(store);
    tracker.refresh().await.unwrap();

    tracker.delete_item("a").await.unwrap();
    assert_eq!(ids(&tracker.items()), vec!["b"]);
}

#[tokio::test]
async fn project_lifecycle_updates_both_collections() {
    let store = Arc::new(MemoryStore::from_records(RecordSet {
        items: vec![{
            let mut scoped = item("a", None, 1);
            scoped.project_id = Some("p1".into());
            scoped
        }],
        projects: vec![project("p1", 1)],
    }));
    let tracker = tracker_over(store);
    tracker.refresh().await.unwrap();

    let mut input = NewProject::titled("Garden");
    input.color = Some(ProjectColor::Green);
    let created = tracker.create_project(input).await.unwrap();
    assert_eq!(created.position, 2);
    assert_eq!(created.color, ProjectColor::Green);

    tracker.delete_project("p1").await.unwrap();
    assert_eq!(tracker.projects().len(), 1);
    assert_eq!(tracker.item_cache().get("a").unwrap().project_id, None);
    assert_eq!(
        tracker.forest_in(&ProjectScope::Unassigned).len(),
        1
    );
}

#[cfg(feature = "telemetry")]
#[tokio::test]
async fn rollback_is_recorded() {
    use crate::telemetry::Event;

    let store = seeded_store();
    let tracker = tracker_over(store.clone());
    tracker.refresh().await.unwrap();
    store.fail_next_write();
    let _ = tracker.delete_item("b").await;

    assert!(tracker.telemetry().events().iter().any(|event| matches!(
        event,
        Event::MutationRolledBack {
            collection: CollectionKind::Items,
            action: "delete",
            ..
        }
    )));
}
