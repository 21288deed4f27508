//! Property tests for the wire codec and envelopes.

use courier::{codec, Envelope, Timestamp};
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        any::<u64>().prop_map(|n| Value::Number(n.into())),
        any::<f64>()
            .prop_filter_map("finite floats only", Number::from_f64)
            .prop_map(Value::Number),
        ".*".prop_map(Value::String),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map(".*", inner, 0..8)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

proptest! {
    #[test]
    fn decode_inverts_encode(value in json_value()) {
        let text = codec::encode(&value).expect("JSON values always encode");
        prop_assert_eq!(codec::decode(&text), value);
    }

    #[test]
    fn decode_never_fails(text in ".*") {
        let decoded = codec::decode(&text);
        if serde_json::from_str::<Value>(&text).is_err() {
            prop_assert_eq!(decoded, Value::String(text));
        }
    }

    #[test]
    fn envelopes_survive_the_wire(secs in 0.0f64..4_000_000_000.0, content in json_value()) {
        let envelope = Envelope::new(Timestamp(secs), content);
        let text = envelope.encode().unwrap();
        prop_assert_eq!(Envelope::decode(text.as_bytes()).unwrap(), envelope);
    }
}
