use attrarium::attribute::AttrValue;
use attrarium::error::{AttrError, Result};
use attrarium::kind::AttrKind;

fn assert_unsupported<T: std::fmt::Debug>(result: Result<T>, what: &str) {
    match result {
        Err(AttrError::Unsupported { .. }) => (),
        other => panic!("{what} should be unsupported, got {other:?}"),
    }
}

fn samples() -> Vec<AttrValue> {
    let mut list = AttrValue::list();
    list.push(AttrValue::Long(1)).unwrap();
    let mut map = AttrValue::map();
    map.put("k", AttrValue::Long(1)).unwrap();
    vec![
        AttrValue::Bool(true),
        AttrValue::Byte(1),
        AttrValue::Short(2),
        AttrValue::Int(3),
        AttrValue::Long(4),
        AttrValue::Float(5.0),
        AttrValue::Double(6.0),
        AttrValue::Text("seven".to_owned()),
        AttrValue::Blob(vec![8]),
        list,
        map,
    ]
}

#[test]
fn every_mismatched_accessor_is_rejected() {
    for sample in samples() {
        let mut value = sample.clone();
        let kind = value.kind();
        if kind != AttrKind::Bool {
            assert_unsupported(value.bool_value(), "bool_value");
            assert_unsupported(value.set_bool_value(false), "set_bool_value");
        }
        if kind != AttrKind::Byte {
            assert_unsupported(value.byte_value(), "byte_value");
            assert_unsupported(value.set_byte_value(0), "set_byte_value");
        }
        if kind != AttrKind::Short {
            assert_unsupported(value.short_value(), "short_value");
            assert_unsupported(value.set_short_value(0), "set_short_value");
        }
        if kind != AttrKind::Int {
            assert_unsupported(value.int_value(), "int_value");
            assert_unsupported(value.set_int_value(0), "set_int_value");
        }
        if kind != AttrKind::Long {
            assert_unsupported(value.long_value(), "long_value");
            assert_unsupported(value.set_long_value(0), "set_long_value");
        }
        if kind != AttrKind::Float {
            assert_unsupported(value.float_value(), "float_value");
            assert_unsupported(value.set_float_value(0.0), "set_float_value");
        }
        if kind != AttrKind::Double {
            assert_unsupported(value.double_value(), "double_value");
            assert_unsupported(value.set_double_value(0.0), "set_double_value");
        }
        if kind != AttrKind::Text {
            assert_unsupported(value.text_value(), "text_value");
            assert_unsupported(value.set_text_value(String::new()), "set_text_value");
        }
        if kind != AttrKind::Blob {
            assert_unsupported(value.blob_value(), "blob_value");
            assert_unsupported(value.set_blob_value(Vec::new()), "set_blob_value");
        }
        if kind != AttrKind::List {
            assert_unsupported(value.get(0), "get");
            assert_unsupported(value.push(AttrValue::Bool(true)), "push");
            assert_unsupported(value.insert(0, AttrValue::Bool(true)), "insert");
            assert_unsupported(value.remove(0), "remove");
            assert_unsupported(value.set(0, AttrValue::Bool(true)), "set");
            assert_unsupported(value.iter(), "iter");
        }
        if kind != AttrKind::Map {
            assert_unsupported(value.lookup("k"), "lookup");
            assert_unsupported(value.put("k", AttrValue::Bool(true)), "put");
            assert_unsupported(value.remove_key("k"), "remove_key");
            assert_unsupported(value.keys(), "keys");
            assert_unsupported(value.values(), "values");
            assert_unsupported(value.entries(), "entries");
        }
        if kind.is_scalar() {
            assert_unsupported(value.len(), "len");
            assert_unsupported(value.clear(), "clear");
        }
    }
}

#[test]
fn matching_accessors_succeed() {
    for sample in samples() {
        match sample.kind() {
            AttrKind::Bool => assert!(sample.bool_value().is_ok()),
            AttrKind::Byte => assert!(sample.byte_value().is_ok()),
            AttrKind::Short => assert!(sample.short_value().is_ok()),
            AttrKind::Int => assert!(sample.int_value().is_ok()),
            AttrKind::Long => assert!(sample.long_value().is_ok()),
            AttrKind::Float => assert!(sample.float_value().is_ok()),
            AttrKind::Double => assert!(sample.double_value().is_ok()),
            AttrKind::Text => assert!(sample.text_value().is_ok()),
            AttrKind::Blob => assert!(sample.blob_value().is_ok()),
            AttrKind::List => assert!(sample.get(0).is_ok()),
            AttrKind::Map => assert!(sample.lookup("k").is_ok()),
        }
    }
}

#[test]
fn the_error_names_the_kind_and_the_operation() {
    let err = AttrValue::Text("x".to_owned()).int_value().unwrap_err();
    match err {
        AttrError::Unsupported { kind, op } => {
            assert_eq!(kind, AttrKind::Text);
            assert_eq!(op, "int_value");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
