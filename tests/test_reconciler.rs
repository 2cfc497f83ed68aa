//! Integration tests for drag-and-drop reconciliation.
//!
//! Tests cover:
//! - Drops on status zones, on other cards, and on unknown targets
//! - Optimistic cache update before the patch resolves
//! - Pointer activation distance and drag state transitions

mod common;

use common::*;
use jobboard::reconciler::{CancelReason, Point};
use jobboard::store::PatchOutcome;
use jobboard::{DragOutcome, DragPhase, DragReconciler, DropTarget};

fn reconciler(store: &ApplicationStore) -> DragReconciler {
    DragReconciler::new(store.clone(), 8.0)
}

#[tokio::test]
async fn test_zone_drop_updates_cache_before_patch_resolves() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    backend.gate_patches();
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::zone(Status::Interview)))?;

    // Optimistic value is visible before the spawned patch has even run.
    assert_eq!(store.cached_by_id("a").unwrap().status, Status::Interview);
    assert!(matches!(drag.phase(), DragPhase::Settled));

    let DragOutcome::Dispatched { from, to, handle, .. } = outcome else {
        panic!("expected a dispatched patch");
    };
    assert_eq!((from, to), (Status::Applied, Status::Interview));

    wait_for_patches(&backend, 1).await;
    assert!(!handle.is_finished());
    assert_eq!(store.cached_by_id("a").unwrap().status, Status::Interview);

    backend.release_patches(1);
    let settled = handle.await?;
    assert!(matches!(settled, PatchOutcome::Confirmed(_)));

    let patches = backend.patch_calls();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "a");
    assert_eq!(patches[0].1.status, Some(3));
    Ok(())
}

#[tokio::test]
async fn test_drop_on_own_column_issues_no_patch() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 4)]).await;
    let before = store.snapshot();
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::zone(Status::Offer)))?;
    assert!(matches!(outcome, DragOutcome::Unchanged { status: Status::Offer, .. }));

    tokio::task::yield_now().await;
    assert!(backend.patch_calls().is_empty());
    assert_eq!(store.snapshot(), before);
    Ok(())
}

#[tokio::test]
async fn test_drop_on_card_joins_that_cards_column() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0), wire("b", "Beta", 4)]).await;
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::element("b")))?;

    assert_eq!(store.cached_by_id("a").unwrap().status, Status::Offer);
    assert_eq!(store.cached_by_id("b").unwrap().status, Status::Offer);

    let DragOutcome::Dispatched { to, handle, .. } = outcome else {
        panic!("expected a dispatched patch");
    };
    assert_eq!(to, Status::Offer);
    assert!(handle.await?.is_success());

    let patches = backend.patch_calls();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "a");
    assert_eq!(patches[0].1.status, Some(4));
    assert_eq!(backend.raw("a").unwrap().status, 4);
    Ok(())
}

#[tokio::test]
async fn test_drop_on_symbolic_status_id_falls_back_to_that_status() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::element("ONLINE_ASSESSMENT")))?;
    let DragOutcome::Dispatched { to, handle, .. } = outcome else {
        panic!("expected a dispatched patch");
    };
    assert_eq!(to, Status::OnlineAssessment);
    handle.await?;
    assert_eq!(backend.raw("a").unwrap().status, 2);
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_target_cancels_and_returns_to_idle() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    let before = store.snapshot();
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::element("trash-can")))?;
    assert!(matches!(
        outcome,
        DragOutcome::Cancelled(CancelReason::UnresolvableTarget(ref id)) if id == "trash-can"
    ));
    assert_eq!(drag.phase(), &DragPhase::Idle);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(None)?;
    assert!(matches!(outcome, DragOutcome::Cancelled(CancelReason::NoTarget)));
    assert_eq!(drag.phase(), &DragPhase::Idle);

    tokio::task::yield_now().await;
    assert!(backend.patch_calls().is_empty());
    assert_eq!(store.snapshot(), before);
    Ok(())
}

#[tokio::test]
async fn test_unknown_source_is_cancelled() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    let mut drag = reconciler(&store);

    drag.begin_drag("ghost")?;
    let outcome = drag.end_drag(Some(DropTarget::zone(Status::Offer)))?;
    assert!(matches!(outcome, DragOutcome::Cancelled(CancelReason::UnknownSource(_))));
    assert!(backend.patch_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_scenario_drag_applied_onto_offer_card() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0), wire("b", "Beta", 4)]).await;
    backend.gate_patches();
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::element("b")))?;

    let statuses: Vec<(String, Status)> = store.cached().into_iter().map(|a| (a.id, a.status)).collect();
    assert_eq!(
        statuses,
        vec![("a".to_string(), Status::Offer), ("b".to_string(), Status::Offer)]
    );

    wait_for_patches(&backend, 1).await;
    backend.release_patches(1);
    if let DragOutcome::Dispatched { handle, .. } = outcome {
        handle.await?;
    }
    assert_eq!(backend.patch_calls().len(), 1);
    assert_eq!(backend.patch_calls()[0].1.status, Some(4));
    Ok(())
}

#[tokio::test]
async fn test_failed_drop_rolls_back_cache() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    backend.fail_patches(true);
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let outcome = drag.end_drag(Some(DropTarget::zone(Status::Offer)))?;
    assert_eq!(store.cached_by_id("a").unwrap().status, Status::Offer);

    let DragOutcome::Dispatched { handle, .. } = outcome else {
        panic!("expected a dispatched patch");
    };
    let settled = handle.await?;
    assert!(matches!(settled, PatchOutcome::RolledBack(_)));
    assert_eq!(store.cached_by_id("a").unwrap().status, Status::Applied);
    Ok(())
}

#[tokio::test]
async fn test_second_drag_while_dragging_is_rejected() -> anyhow::Result<()> {
    let (store, _backend) = loaded_store(vec![wire("a", "Acme", 0), wire("b", "Beta", 0)]).await;
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    let err = drag.begin_drag("b").unwrap_err();
    assert!(matches!(err, BoardError::InvalidDragState(_)));
    assert!(matches!(drag.phase(), DragPhase::Dragging { source } if source == "a"));
    Ok(())
}

#[tokio::test]
async fn test_end_without_drag_is_an_error() {
    let (store, _backend) = loaded_store(vec![]).await;
    let mut drag = reconciler(&store);
    let err = drag.end_drag(Some(DropTarget::zone(Status::Offer))).unwrap_err();
    assert!(matches!(err, BoardError::InvalidDragState(_)));
    assert_eq!(drag.phase(), &DragPhase::Idle);
}

#[tokio::test]
async fn test_pointer_must_travel_activation_distance() -> anyhow::Result<()> {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    let mut drag = reconciler(&store);

    drag.pointer_down("a", Point::new(100.0, 100.0))?;
    assert!(!drag.pointer_move(Point::new(103.0, 104.0)));
    let outcome = drag.pointer_up(Some(DropTarget::zone(Status::Offer)))?;
    assert!(matches!(outcome, DragOutcome::Cancelled(CancelReason::NotActivated)));
    assert_eq!(drag.phase(), &DragPhase::Idle);

    drag.pointer_down("a", Point::new(100.0, 100.0))?;
    assert!(drag.pointer_move(Point::new(106.0, 108.0)));
    assert!(matches!(drag.phase(), DragPhase::Dragging { .. }));
    let outcome = drag.pointer_up(Some(DropTarget::zone(Status::Offer)))?;
    if let DragOutcome::Dispatched { handle, .. } = outcome {
        handle.await?;
    } else {
        panic!("expected a dispatched patch");
    }
    assert_eq!(backend.patch_calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_pointer_cancel_resets_state() -> anyhow::Result<()> {
    let (store, _backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    let mut drag = reconciler(&store);

    drag.begin_drag("a")?;
    drag.pointer_cancel();
    assert_eq!(drag.phase(), &DragPhase::Idle);
    drag.begin_drag("a")?;
    Ok(())
}

#[tokio::test]
async fn test_move_card_reaches_records_past_the_loaded_page() -> anyhow::Result<()> {
    let backend = FakeBackend::new();
    for record in [wire("a", "Acme", 0), wire("b", "Beta", 0), wire("c", "Cobalt", 3)] {
        backend.insert_raw(record);
    }
    let store = ApplicationStore::new(backend.clone());
    store
        .list(&ListQuery {
            limit: Some(1),
            ..ListQuery::default()
        })
        .await?;
    assert!(store.cached_by_id("b").is_none());
    let mut drag = reconciler(&store);

    let DragOutcome::Dispatched { to, handle, .. } = drag.move_card("b", "OFFER").await? else {
        panic!("expected a dispatched patch");
    };
    assert_eq!(to, Status::Offer);
    handle.await?;
    assert_eq!(backend.raw("b").unwrap().status, 4);

    // Target card is off the loaded page too.
    let DragOutcome::Dispatched { to, handle, .. } = drag.move_card("a", "c").await? else {
        panic!("expected a dispatched patch");
    };
    assert_eq!(to, Status::Interview);
    handle.await?;
    assert_eq!(backend.raw("a").unwrap().status, 3);
    Ok(())
}

#[tokio::test]
async fn test_move_card_with_missing_source_is_not_found() {
    let (store, backend) = loaded_store(vec![wire("a", "Acme", 0)]).await;
    let mut drag = reconciler(&store);

    let err = drag.move_card("ghost", "OFFER").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(drag.phase(), &DragPhase::Idle);

    let outcome = drag.move_card("a", "nowhere").await.unwrap();
    assert!(matches!(outcome, DragOutcome::Cancelled(CancelReason::UnresolvableTarget(_))));
    assert!(backend.patch_calls().is_empty());
}
