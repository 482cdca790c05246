use checklist_core::db::open_db_in_memory;
use checklist_core::{ChecklistItem, ItemCounts, ItemStore, StoreError, StoreErrorKind};

fn store_with(descriptions: &[&str]) -> (ItemStore, Vec<i64>) {
    let store = ItemStore::open_in_memory().unwrap();
    let ids = descriptions
        .iter()
        .map(|description| store.insert(description).unwrap())
        .collect();
    (store, ids)
}

fn checked_states(store: &ItemStore) -> Vec<bool> {
    store
        .fetch_all()
        .unwrap()
        .into_iter()
        .map(|item| item.checked)
        .collect()
}

#[test]
fn insert_returns_strictly_increasing_ids() {
    let (_store, ids) = store_with(&["a", "b", "c", "d", "e"]);
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1], "ids not increasing: {ids:?}");
    }
}

#[test]
fn fetch_all_returns_creation_order() {
    let (store, ids) = store_with(&["A", "B", "C"]);

    let items = store.fetch_all().unwrap();
    let descriptions: Vec<&str> = items.iter().map(|item| item.description.as_str()).collect();
    assert_eq!(descriptions, vec!["A", "B", "C"]);
    assert_eq!(items.iter().map(|item| item.id).collect::<Vec<_>>(), ids);
    assert!(items.iter().all(|item| !item.checked));
}

#[test]
fn ordering_ignores_checked_state() {
    let (store, ids) = store_with(&["first", "second", "third"]);
    store.flip(ids[1]).unwrap();

    let items = store.fetch_all().unwrap();
    assert_eq!(items.iter().map(|item| item.id).collect::<Vec<_>>(), ids);
}

#[test]
fn ids_are_not_reused_after_deleting_newest_item() {
    let (store, ids) = store_with(&["one", "two"]);
    assert!(store.delete(ids[1]).unwrap());

    let next = store.insert("three").unwrap();
    assert!(next > ids[1]);
}

#[test]
fn flip_twice_restores_original_state() {
    let (store, ids) = store_with(&["toggle"]);

    assert!(store.flip(ids[0]).unwrap());
    assert_eq!(checked_states(&store), vec![true]);
    assert!(store.flip(ids[0]).unwrap());
    assert_eq!(checked_states(&store), vec![false]);
}

#[test]
fn check_all_marks_every_item() {
    let (store, ids) = store_with(&["a", "b", "c"]);
    store.flip(ids[0]).unwrap();

    assert_eq!(store.check_all().unwrap(), 2);
    assert_eq!(checked_states(&store), vec![true, true, true]);
}

#[test]
fn uncheck_all_clears_every_item() {
    let (store, ids) = store_with(&["a", "b", "c"]);
    store.flip(ids[0]).unwrap();
    store.flip(ids[2]).unwrap();

    assert_eq!(store.uncheck_all().unwrap(), 2);
    assert_eq!(checked_states(&store), vec![false, false, false]);
}

#[test]
fn flip_all_inverts_each_item() {
    let (store, ids) = store_with(&["a", "b", "c"]);
    store.flip(ids[1]).unwrap();

    assert_eq!(store.flip_all().unwrap(), 3);
    assert_eq!(checked_states(&store), vec![true, false, true]);
}

#[test]
fn delete_checked_removes_exactly_checked_items() {
    let (store, ids) = store_with(&["one", "two", "three"]);
    store.flip(ids[0]).unwrap();
    store.flip(ids[2]).unwrap();

    assert_eq!(store.delete_checked().unwrap(), 2);

    let remaining = store.fetch_all().unwrap();
    assert_eq!(remaining, vec![ChecklistItem::new(ids[1], "two")]);
}

#[test]
fn bulk_operations_on_empty_store_change_nothing() {
    let store = ItemStore::open_in_memory().unwrap();

    assert_eq!(store.check_all().unwrap(), 0);
    assert_eq!(store.uncheck_all().unwrap(), 0);
    assert_eq!(store.flip_all().unwrap(), 0);
    assert_eq!(store.delete_checked().unwrap(), 0);
    assert!(store.fetch_all().unwrap().is_empty());
}

#[test]
fn operations_on_missing_ids_are_no_ops() {
    let (store, ids) = store_with(&["keep", "gone"]);
    store.flip(ids[0]).unwrap();
    assert!(store.delete(ids[1]).unwrap());
    let before = store.fetch_all().unwrap();

    assert!(!store.delete(ids[1]).unwrap());
    assert!(!store.delete(9_999).unwrap());
    assert!(!store.flip(ids[1]).unwrap());
    assert!(!store.edit(ids[1], "stale edit").unwrap());
    assert!(!store
        .update(&ChecklistItem::new(ids[1], "stale update"))
        .unwrap());
    assert_eq!(store.get(ids[1]).unwrap(), None);

    assert_eq!(store.fetch_all().unwrap(), before);
}

#[test]
fn edit_replaces_description_and_keeps_checked_state() {
    let (store, ids) = store_with(&["draft"]);
    store.flip(ids[0]).unwrap();

    assert!(store.edit(ids[0], "final").unwrap());

    let item = store.get(ids[0]).unwrap().unwrap();
    assert_eq!(item.description, "final");
    assert!(item.checked);
}

#[test]
fn update_replaces_description_and_checked_state() {
    let (store, ids) = store_with(&["draft"]);

    let mut item = store.get(ids[0]).unwrap().unwrap();
    item.description = "rewritten".to_string();
    item.checked = true;
    assert!(store.update(&item).unwrap());

    assert_eq!(store.get(ids[0]).unwrap(), Some(item));
}

#[test]
fn empty_descriptions_are_rejected_without_writing() {
    let (store, ids) = store_with(&["valid"]);

    assert_eq!(store.insert("").unwrap_err(), StoreError::InvalidDescription);
    assert_eq!(
        store.edit(ids[0], "   ").unwrap_err().kind(),
        StoreErrorKind::InvalidDescription
    );
    assert_eq!(
        store
            .update(&ChecklistItem::new(ids[0], "\n"))
            .unwrap_err(),
        StoreError::InvalidDescription
    );

    assert_eq!(store.fetch_all().unwrap(), vec![ChecklistItem::new(ids[0], "valid")]);
}

#[test]
fn count_reports_total_and_checked() {
    let (store, ids) = store_with(&["a", "b", "c", "d"]);
    store.flip(ids[0]).unwrap();
    store.flip(ids[3]).unwrap();

    assert_eq!(
        store.count().unwrap(),
        ItemCounts {
            total: 4,
            checked: 2
        }
    );
}

#[test]
fn clones_share_one_database() {
    let store = ItemStore::open_in_memory().unwrap();
    let other = store.clone();

    let id = other.insert("shared").unwrap();
    assert_eq!(store.get(id).unwrap().unwrap().description, "shared");
}

#[test]
fn file_store_survives_reopen_and_keeps_id_allocation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checklist.db");

    let last_id = {
        let store = ItemStore::open(&path).unwrap();
        store.insert("persisted").unwrap();
        let last = store.insert("removed").unwrap();
        store.delete(last).unwrap();
        last
    };

    let store = ItemStore::open(&path).unwrap();
    let items = store.fetch_all().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "persisted");
    assert!(store.insert("after reopen").unwrap() > last_id);
}

#[test]
fn corrupt_rows_surface_as_persistence_corrupt() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO items (description, checked) VALUES ('', 0);", [])
        .unwrap();
    let store = ItemStore::from_connection(conn).unwrap();

    let err = store.fetch_all().unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::PersistenceCorrupt);

    // Writes keep working after a failed read.
    store.insert("still usable").unwrap();
}
