use attrarium::attribute::{AttrValue, Attribute};
use attrarium::config::StoreConfig;
use attrarium::kind::AttrKind;
use attrarium::store::AttrStore;

fn setup() -> AttrStore {
    AttrStore::in_memory().expect("store")
}

fn scalar_samples() -> Vec<AttrValue> {
    vec![
        AttrValue::Bool(true),
        AttrValue::Byte(-7),
        AttrValue::Short(312),
        AttrValue::Int(-70000),
        AttrValue::Long(1 << 40),
        AttrValue::Float(2.5),
        AttrValue::Double(-0.125),
        AttrValue::Text("alpha".to_owned()),
        AttrValue::Blob(vec![1, 2, 3]),
    ]
}

#[test]
fn scalar_round_trip_preserves_values() {
    let store = setup();
    for value in scalar_samples() {
        let stored = store.create(&value).expect("create");
        assert_eq!(stored.kind(), value.kind());
        assert_eq!(stored.version(), 0);
        let back = store.materialize(&stored).expect("materialize");
        assert_eq!(back, value, "{} should round-trip", value.kind());
        assert_eq!(back.raw(), value.raw());
    }
}

#[test]
fn nested_structure_round_trips() {
    let store = setup();
    let mut inner = AttrValue::list();
    inner.push(AttrValue::Long(1)).unwrap();
    inner.push(AttrValue::Text("two".to_owned())).unwrap();
    let mut outer = AttrValue::map();
    outer.put("numbers", inner).unwrap();
    outer.put("flag", AttrValue::Bool(false)).unwrap();
    let stored = store.create(&outer).expect("create");
    assert_eq!(stored.kind(), AttrKind::Map);
    let back = store.materialize(&stored).expect("materialize");
    assert_eq!(back, outer);
}

#[test]
fn duplicate_is_a_deep_copy_with_its_own_identity() {
    let store = setup();
    let mut value = AttrValue::map();
    value.put("a", AttrValue::Int(1)).unwrap();
    let original = store.create_with_acl(&value, Some(42)).expect("create");
    let copy = store.duplicate(&original).expect("duplicate");
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.acl(), Some(42), "deep copy keeps the ACL reference");
    assert_eq!(
        store.materialize(&copy).unwrap(),
        store.materialize(&original).unwrap()
    );
    // mutating the copy leaves the original alone
    store
        .map(&copy)
        .unwrap()
        .put("a", &AttrValue::Int(9))
        .unwrap();
    assert_eq!(
        store.map(&original).unwrap().get("a").unwrap(),
        Some(AttrValue::Int(1))
    );
}

#[test]
fn long_text_persists_as_blob() {
    let config = StoreConfig {
        database: None,
        max_text_length: 8,
    };
    let store = AttrStore::open(&config).expect("store");
    let text = "a rather long string";
    let stored = store
        .create(&AttrValue::Text(text.to_owned()))
        .expect("create");
    assert_eq!(stored.kind(), AttrKind::Blob, "over-long text switches kind");
    let back = store.materialize(&stored).expect("materialize");
    assert_eq!(back.blob_value().expect("blob"), text.as_bytes());
}

#[test]
fn long_text_substitution_applies_inside_containers() {
    let config = StoreConfig {
        database: None,
        max_text_length: 8,
    };
    let store = AttrStore::open(&config).expect("store");
    let mut list = AttrValue::list();
    list.push(AttrValue::Text("short".to_owned())).unwrap();
    list.push(AttrValue::Text("much longer than eight".to_owned()))
        .unwrap();
    let stored = store.create(&list).expect("create");
    let view = store.list(&stored).unwrap();
    assert_eq!(view.get(0).unwrap(), AttrValue::Text("short".to_owned()));
    assert_eq!(
        view.get(1).unwrap().blob_value().unwrap(),
        "much longer than eight".as_bytes()
    );
}

#[test]
fn short_text_keeps_its_kind() {
    let store = setup();
    let stored = store
        .create(&AttrValue::Text("short".to_owned()))
        .expect("create");
    assert_eq!(stored.kind(), AttrKind::Text);
}

#[test]
fn conversion_to_the_form_already_held_is_identity() {
    let store = setup();
    let value = AttrValue::Long(9);
    let attr = Attribute::Value(value.clone());
    assert_eq!(attr.value_form(&store).unwrap(), value);

    let stored = store.create(&value).unwrap();
    let attr = Attribute::Stored(stored.clone());
    assert_eq!(attr.stored_form(&store).unwrap(), stored);
    assert_eq!(attr.value_form(&store).unwrap(), value);
}

#[test]
fn blob_payloads_encode_and_decode() {
    let encoded = AttrValue::encode(&vec!["a".to_owned(), "b".to_owned()]).expect("encode");
    assert_eq!(encoded.kind(), AttrKind::Blob);
    let decoded: Vec<String> = encoded.decode().expect("decode");
    assert_eq!(decoded, vec!["a".to_owned(), "b".to_owned()]);
}
