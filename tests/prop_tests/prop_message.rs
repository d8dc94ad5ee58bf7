use filelog::Message;
use proptest::prelude::*;
use serde_json::{Value, json};

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]
    #[test]
    fn prop_text_is_unchanged(s in ".{0,64}") {
        prop_assert_eq!(Message::from(s.as_str()).normalize(), s);
    }

    #[test]
    fn prop_integers_render_decimal(n in any::<i64>()) {
        prop_assert_eq!(Message::from(n).normalize(), n.to_string());
    }

    #[test]
    fn prop_primitive_message_field_is_extracted(
        text in "[A-Za-z0-9 ]{0,32}",
        extra in proptest::collection::hash_map("[a-z]{1,6}", any::<i32>(), 0..4)
    ) {
        let mut obj = serde_json::Map::new();
        for (k, v) in extra {
            obj.insert(k, json!(v));
        }
        obj.insert("message".into(), Value::String(text.clone()));
        prop_assert_eq!(Message::from(Value::Object(obj)).normalize(), text);
    }

    #[test]
    fn prop_sequences_pretty_print_and_parse_back(items in proptest::collection::vec("[a-z]{0,8}", 0..8)) {
        let value = json!(items);
        let out = Message::from(value.clone()).normalize();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn prop_normalization_is_deterministic(b in any::<bool>(), n in any::<u16>()) {
        let v = json!({"flag": b, "n": n});
        prop_assert_eq!(Message::from(&v).normalize(), Message::from(&v).normalize());
        prop_assert!(!Message::from(&v).normalize().is_empty());
    }
}
