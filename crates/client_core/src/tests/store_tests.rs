use super::*;

use shared::domain::{ItemId, ItemStatus};
use shared::protocol::InventoryItem;

fn item(id: i64, name: &str, status: ItemStatus, stock: i64) -> InventoryItem {
    InventoryItem {
        item_id: ItemId(id),
        sku: format!("SKU-{id}"),
        name: name.into(),
        status,
        stock_on_hand: stock,
    }
}

fn keys(store: &EntityStore<InventoryItem>) -> Vec<i64> {
    store.snapshot().iter().map(|row| row.item_id.0).collect()
}

#[test]
fn upsert_prepends_unknown_keys() {
    let mut store = EntityStore::new();
    store.upsert(item(1, "Widget", ItemStatus::Active, 4));
    store.upsert(item(2, "Gadget", ItemStatus::Active, 9));

    assert_eq!(keys(&store), vec![2, 1]);
}

#[test]
fn upsert_replaces_in_place_keeping_index() {
    let mut store = EntityStore::new();
    store.apply_snapshot(vec![
        item(1, "Widget", ItemStatus::Active, 4),
        item(2, "Gadget", ItemStatus::Inactive, 9),
        item(3, "Sprocket", ItemStatus::Active, 1),
    ]);

    store.upsert(item(2, "Gadget", ItemStatus::Active, 12));

    assert_eq!(keys(&store), vec![1, 2, 3]);
    let rows = store.snapshot();
    assert_eq!(rows[1].status, ItemStatus::Active);
    assert_eq!(rows[1].stock_on_hand, 12);
}

#[test]
fn upsert_is_idempotent() {
    let mut store = EntityStore::new();
    store.apply_snapshot(vec![item(1, "Widget", ItemStatus::Active, 4)]);

    let update = item(1, "Widget", ItemStatus::Inactive, 0);
    store.upsert(update.clone());
    let once = store.snapshot();
    store.upsert(update);
    assert_eq!(store.snapshot(), once);
}

#[test]
fn remove_is_a_noop_for_absent_keys() {
    let mut store = EntityStore::new();
    store.apply_snapshot(vec![item(1, "Widget", ItemStatus::Active, 4)]);

    assert!(!store.remove(&ItemId(99)));
    assert_eq!(store.len(), 1);
    assert!(store.remove(&ItemId(1)));
    assert!(store.is_empty());
}

#[test]
fn remove_all_ignores_absent_keys() {
    let mut store = EntityStore::new();
    store.apply_snapshot(vec![
        item(1, "Widget", ItemStatus::Active, 4),
        item(2, "Gadget", ItemStatus::Active, 9),
        item(3, "Sprocket", ItemStatus::Active, 1),
    ]);

    store.remove_all([ItemId(2), ItemId(42)].iter());

    assert_eq!(keys(&store), vec![1, 3]);
}

#[test]
fn snapshot_establishes_the_baseline_on_an_empty_store() {
    let mut store = EntityStore::new();
    store.apply_snapshot(vec![
        item(1, "Widget", ItemStatus::Active, 4),
        item(2, "Gadget", ItemStatus::Inactive, 9),
    ]);

    assert_eq!(keys(&store), vec![1, 2]);
}

#[test]
fn snapshot_fills_gaps_without_clobbering_push_state() {
    let mut store = EntityStore::new();
    // Push events processed before the bulk read resolves.
    store.upsert(item(9, "Flange", ItemStatus::Active, 2));
    store.upsert(item(2, "Gadget", ItemStatus::Active, 12));

    store.apply_snapshot(vec![
        item(1, "Widget", ItemStatus::Active, 4),
        item(2, "Gadget", ItemStatus::Inactive, 9),
        item(3, "Sprocket", ItemStatus::Active, 1),
    ]);

    // Push-derived rows keep their place and value; unseen snapshot keys are
    // appended in snapshot order.
    assert_eq!(keys(&store), vec![2, 9, 1, 3]);
    let rows = store.snapshot();
    assert_eq!(rows[0].status, ItemStatus::Active);
    assert_eq!(rows[0].stock_on_hand, 12);
}
