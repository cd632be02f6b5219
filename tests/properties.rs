//! Property tests for document and definition validation

use proptest::prelude::*;
use serde_json::{json, Value};
use syncschema::values::SchemaFn;
use syncschema::{schema, validate_definitions, validate_document, SchemaValue};

fn definition(validator: SchemaValue) -> SchemaValue {
    SchemaValue::object([
        ("typeFilter", SchemaFn::type_filter(|_, _, _| true).into()),
        ("channels", schema!({ "write": "c" })),
        ("propertyValidators", SchemaValue::object([("p", validator)])),
    ])
}

fn violations(doc: &Value, old_doc: Option<&Value>, validator: SchemaValue) -> Vec<String> {
    validate_document(doc, old_doc, &definition(validator))
        .unwrap()
        .into_iter()
        .map(|v| v.message)
        .collect()
}

/// A type name together with a value of that type
fn typed_value() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        any::<String>().prop_map(|s| ("string", json!(s))),
        (-(1i64 << 53)..(1i64 << 53)).prop_map(|n| ("integer", json!(n))),
        (-1.0e12f64..1.0e12).prop_map(|f| ("float", json!(f))),
        any::<bool>().prop_map(|b| ("boolean", json!(b))),
        (1000u32..9999, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| ("date", json!(format!("{:04}-{:02}-{:02}", y, m, d)))),
        (1000u32..9999, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60, -12i32..=12).prop_map(
            |(y, mo, d, h, mi, s, tz)| {
                let zone = if tz == 0 {
                    "Z".to_string()
                } else {
                    format!("{}{:02}:00", if tz < 0 { '-' } else { '+' }, tz.abs())
                };
                ("datetime", json!(format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}", y, mo, d, h, mi, s, zone)))
            }
        ),
        "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}".prop_map(|u| ("uuid", json!(u))),
        prop::collection::vec(any::<i32>(), 0..5).prop_map(|v| ("array", json!(v))),
        prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 0..5).prop_map(|m| ("hashtable", json!(m))),
    ]
}

proptest! {
    #[test]
    fn test_native_values_are_accepted((ty, value) in typed_value()) {
        let found = violations(&json!({ "p": value }), None, schema!({ "type": ty }));
        prop_assert!(found.is_empty(), "{} rejected: {:?}", ty, found);
    }

    #[test]
    fn test_required_reports_once((ty, _) in typed_value(), null in any::<bool>()) {
        let doc = if null { json!({ "p": null }) } else { json!({}) };
        let validator = schema!({ "type": ty, "required": true, "mustEqual": "x", "immutable": true });
        let found = violations(&doc, None, validator);
        prop_assert_eq!(found, vec!["required property \"p\" is missing".to_string()]);
    }

    #[test]
    fn test_immutable_replace((ty, value) in typed_value()) {
        let validator = || schema!({ "type": "object", "allowUnknownProperties": true, "immutable": true });
        let old = json!({ "p": { "v": value } });
        let new = json!({ "p": { "v": value, "edited": true } });

        prop_assert!(violations(&old, None, validator()).is_empty(), "{} creation rejected", ty);
        prop_assert!(violations(&old, Some(&old), validator()).is_empty());
        prop_assert_eq!(
            violations(&new, Some(&old), validator()),
            vec!["property \"p\" may not be updated".to_string()]
        );
    }

    #[test]
    fn test_size_bounds_must_be_ordered(minimum in 0i64..1000, maximum in 0i64..1000) {
        let validator = SchemaValue::object([
            ("type", SchemaValue::from("hashtable")),
            ("minimumSize", minimum.into()),
            ("maximumSize", maximum.into()),
        ]);
        let definitions = SchemaValue::object([("myDoc", definition(validator))]);
        let defects = validate_definitions(&definitions);

        if maximum < minimum {
            prop_assert_eq!(defects.len(), 1);
            prop_assert_eq!(
                defects[0].message.clone(),
                format!("\"maximumSize\" must be larger than or equal to {}", minimum)
            );
        } else {
            prop_assert!(defects.is_empty());
        }
    }
}
