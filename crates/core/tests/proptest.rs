//! Property-based tests for weft-core using proptest.

use proptest::prelude::*;
use weft_core::{Map, Path, Value};

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_$]{1,8}"
}

fn tree(leaf: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map>())),
        ]
    })
}

fn scalar(number: BoxedStrategy<f64>) -> BoxedStrategy<Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        number.prop_map(Value::Number),
        "\\PC{0,12}".prop_map(Value::String),
    ]
    .boxed()
}

proptest! {
    /// Displaying a path and parsing it back yields the same keys.
    #[test]
    fn path_display_parses_back(keys in prop::collection::vec(segment(), 1..6)) {
        let path = Path::from_keys(keys.clone());
        let text = path.to_string();
        let parsed = Path::parse(&text).unwrap();
        prop_assert_eq!(parsed.keys(), keys.as_slice());
        prop_assert_eq!(&parsed, &path);
        prop_assert_eq!(Path::parse(&format!("  {text} ")).unwrap(), path);
    }

    /// An empty segment anywhere makes the text invalid.
    #[test]
    fn empty_segment_rejected(keys in prop::collection::vec(segment(), 1..4), at in 0usize..4) {
        let mut keys = keys;
        let at = at.min(keys.len());
        keys.insert(at, String::new());
        prop_assert!(Path::parse(&keys.join(".")).is_err());
    }

    /// Defined values survive conversion to a JSON tree and back.
    #[test]
    fn value_json_tree_round_trip(
        value in tree(scalar(any::<f64>().prop_filter("finite", |n| n.is_finite()).boxed()))
    ) {
        let json = serde_json::Value::from(value.clone());
        prop_assert_eq!(Value::from(json), value);
    }

    /// Serialized text parses back into an equal value.
    #[test]
    fn value_json_text_round_trip(
        value in tree(scalar((-1_000_000i64..1_000_000).prop_map(|n| n as f64).boxed()))
    ) {
        let text = serde_json::to_string(&value).unwrap();
        prop_assert_eq!(Value::from_json_str(&text).unwrap(), value);
    }
}

#[test]
fn undefined_serializes_as_null() {
    let value = Value::Array(vec![Value::Undefined, Value::from(1)]);
    assert_eq!(serde_json::to_string(&value).unwrap(), "[null,1]");
}
