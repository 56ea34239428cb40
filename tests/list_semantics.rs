use attrarium::attribute::AttrValue;
use attrarium::error::AttrError;
use attrarium::store::AttrStore;

fn setup() -> AttrStore {
    AttrStore::in_memory().expect("store")
}

fn text(s: &str) -> AttrValue {
    AttrValue::Text(s.to_owned())
}

#[test]
fn value_form_insert_shifts_and_remove_renumbers() {
    let mut list = AttrValue::list();
    for name in ["A", "B", "C"] {
        list.push(text(name)).unwrap();
    }
    list.insert(1, text("X")).unwrap();
    let after_insert: Vec<String> = list
        .iter()
        .unwrap()
        .map(|item| item.text_value().unwrap().to_owned())
        .collect();
    assert_eq!(after_insert, ["A", "X", "B", "C"]);

    list.remove(0).unwrap();
    let after_remove: Vec<String> = list
        .iter()
        .unwrap()
        .map(|item| item.text_value().unwrap().to_owned())
        .collect();
    assert_eq!(after_remove, ["X", "B", "C"]);
}

#[test]
fn value_form_rejects_out_of_range_indices() {
    let mut list = AttrValue::list();
    list.push(text("A")).unwrap();
    assert!(matches!(
        list.insert(3, text("X")),
        Err(AttrError::InvalidArgument(_))
    ));
    assert!(matches!(list.remove(1), Err(AttrError::InvalidArgument(_))));
    assert!(matches!(
        list.set(1, text("X")),
        Err(AttrError::InvalidArgument(_))
    ));
    assert!(matches!(list.get(1), Err(AttrError::InvalidArgument(_))));
    // inserting at the current length appends
    list.insert(1, text("B")).unwrap();
    assert_eq!(list.len().unwrap(), 2);
}

#[test]
fn stored_insert_shifts_and_remove_renumbers() {
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    for name in ["A", "B", "C"] {
        list.push(&text(name)).unwrap();
    }
    list.insert(1, &text("X")).unwrap();
    let after_insert: Vec<AttrValue> = list.iter().unwrap().collect();
    assert_eq!(
        after_insert,
        vec![text("A"), text("X"), text("B"), text("C")]
    );

    list.remove(0).unwrap();
    let after_remove: Vec<AttrValue> = list.iter().unwrap().collect();
    assert_eq!(after_remove, vec![text("X"), text("B"), text("C")]);

    // gap-free: every index below len is retrievable, the one at len is not
    let len = list.len().unwrap();
    assert_eq!(len, 3);
    for index in 0..len {
        list.get(index).unwrap_or_else(|e| panic!("index {index} should be dense: {e}"));
    }
    assert!(matches!(
        list.get(len),
        Err(AttrError::InvalidArgument(_))
    ));
}

#[test]
fn stored_bounds_are_checked() {
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    assert!(matches!(
        list.insert(1, &text("X")),
        Err(AttrError::InvalidArgument(_))
    ));
    assert!(matches!(list.remove(0), Err(AttrError::InvalidArgument(_))));
    assert!(matches!(
        list.set(0, &text("X")),
        Err(AttrError::InvalidArgument(_))
    ));
    list.insert(0, &text("A")).unwrap();
    assert_eq!(list.len().unwrap(), 1);
}

#[test]
fn stored_set_replaces_and_deletes_the_old_attribute() {
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    list.push(&text("A")).unwrap();
    list.push(&text("B")).unwrap();
    let old = list.entries().unwrap()[1].attr.id();

    list.set(1, &text("B2")).unwrap();
    assert_eq!(list.get(1).unwrap(), text("B2"));
    assert!(
        matches!(store.load(old), Err(AttrError::InvalidArgument(_))),
        "the replaced attribute's row should be gone"
    );
}

#[test]
fn stored_remove_deletes_the_detached_subtree() {
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    let mut nested = AttrValue::map();
    nested.put("inner", AttrValue::Long(5)).unwrap();
    list.push(&nested).unwrap();
    let entries = list.entries().unwrap();
    let child_map = entries[0].attr.clone();
    let grandchild = store.map(&child_map).unwrap().entry_set().unwrap()[0]
        .attr
        .id();

    list.remove(0).unwrap();
    assert!(matches!(
        store.load(child_map.id()),
        Err(AttrError::InvalidArgument(_))
    ));
    assert!(matches!(
        store.load(grandchild),
        Err(AttrError::InvalidArgument(_))
    ));
}

#[test]
fn stored_clear_empties_the_list() {
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    for i in 0..4 {
        list.push(&AttrValue::Long(i)).unwrap();
    }
    let ids: Vec<_> = list.entries().unwrap().iter().map(|e| e.attr.id()).collect();
    list.clear().unwrap();
    assert_eq!(list.len().unwrap(), 0);
    for id in ids {
        assert!(matches!(
            store.load(id),
            Err(AttrError::InvalidArgument(_))
        ));
    }
}

#[test]
fn iteration_restarts_from_current_state() {
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    list.push(&AttrValue::Long(1)).unwrap();
    assert_eq!(list.iter().unwrap().count(), 1);
    list.push(&AttrValue::Long(2)).unwrap();
    // a fresh call sees the new entry
    assert_eq!(list.iter().unwrap().count(), 2);
}

#[test]
fn list_view_requires_a_list_attribute() {
    let store = setup();
    let scalar = store.create(&AttrValue::Long(1)).expect("create");
    assert!(matches!(
        store.list(&scalar),
        Err(AttrError::Unsupported { .. })
    ));
}

#[test]
fn list_entries_hash_by_structural_key() {
    use std::collections::HashSet;
    let store = setup();
    let stored = store.create(&AttrValue::list()).expect("create");
    let list = store.list(&stored).expect("view");
    list.push(&text("A")).unwrap();
    let before = list.entries().unwrap()[0].clone();
    list.set(0, &text("B")).unwrap();
    let after = list.entries().unwrap()[0].clone();
    // same (list, index) key, different bound attribute: still equal
    assert_eq!(before, after);
    let mut keys = HashSet::new();
    keys.insert(before);
    keys.insert(after);
    assert_eq!(keys.len(), 1);
}
