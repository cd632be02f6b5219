//! Property validator grammar
//!
//! Every entry of a `propertyValidators` object, and every nested
//! `arrayElementsValidator` / `hashtableValuesValidator`, is checked here.
//! The node's `type` selects which constraints are legal; the composite
//! types nest further validators through [`Rule::PropertyValidator`], which
//! refers back to this grammar lazily at check time.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::rules::{Checker, Field, NumberRule, ObjectRule, Rule, SiblingBound};
use crate::constraints::ConstraintScope;
use crate::limits::MAX_ATTACHMENT_SIZE;
use crate::validators::builtins::PropertyType;

const PROPERTY_ARITY: usize = ConstraintScope::Property.max_arity();

static LENGTH_BOUNDS: [SiblingBound; 1] = [SiblingBound {
    key: "minimumLength",
    exclusive: false,
}];

static SIZE_BOUNDS: [SiblingBound; 1] = [SiblingBound {
    key: "minimumSize",
    exclusive: false,
}];

static MAXIMUM_INCLUSIVE_BOUNDS: [SiblingBound; 2] = [
    SiblingBound {
        key: "minimumValue",
        exclusive: false,
    },
    SiblingBound {
        key: "minimumValueExclusive",
        exclusive: true,
    },
];

static MAXIMUM_EXCLUSIVE_BOUNDS: [SiblingBound; 2] = [
    SiblingBound {
        key: "minimumValue",
        exclusive: true,
    },
    SiblingBound {
        key: "minimumValueExclusive",
        exclusive: true,
    },
];

/// Constraints that may not be combined within one validator
static EXCLUSIONS: [(&str, &[&str]); 12] = [
    ("required", &["mustNotBeMissing", "mustNotBeNull"]),
    ("mustNotBeMissing", &["required", "mustNotBeNull"]),
    ("mustNotBeNull", &["required", "mustNotBeMissing"]),
    ("mustEqual", &["mustEqualStrict"]),
    ("minimumValue", &["minimumValueExclusive", "mustEqual", "mustEqualStrict"]),
    ("minimumValueExclusive", &["minimumValue", "mustEqual", "mustEqualStrict"]),
    ("maximumValue", &["maximumValueExclusive", "mustEqualStrict", "mustEqual"]),
    ("maximumValueExclusive", &["maximumValue", "mustEqualStrict", "mustEqual"]),
    ("immutable", &["immutableStrict", "immutableWhenSet", "immutableWhenSetStrict"]),
    ("immutableStrict", &["immutable", "immutableWhenSet", "immutableWhenSetStrict"]),
    ("immutableWhenSet", &["immutable", "immutableStrict", "immutableWhenSetStrict"]),
    ("immutableWhenSetStrict", &["immutable", "immutableStrict", "immutableWhenSet"]),
];

/// Object rule for each property type, built once
static TYPE_RULES: Lazy<HashMap<PropertyType, ObjectRule>> = Lazy::new(|| {
    PropertyType::ALL
        .iter()
        .map(|ty| (*ty, type_rule(*ty)))
        .collect()
});

/// Names of the type vocabulary, as listed in defect messages
static TYPE_NAMES: Lazy<String> = Lazy::new(|| {
    PropertyType::ALL
        .iter()
        .map(|ty| ty.name())
        .collect::<Vec<_>>()
        .join(", ")
});

fn dynamic(rule: Rule) -> Rule {
    rule.dynamic(PROPERTY_ARITY)
}

fn maximum_value(number: NumberRule, bounds: &'static [SiblingBound]) -> Rule {
    dynamic(number.with_siblings(bounds).into())
}

/// Shape of a literal value of the given type, as used by `mustEqual`
fn comparison_rule(ty: PropertyType) -> Rule {
    match ty {
        PropertyType::String | PropertyType::AttachmentReference => Rule::String { min_len: 0 },
        PropertyType::Integer => NumberRule::integer().into(),
        PropertyType::Float => NumberRule::number().into(),
        PropertyType::Boolean => Rule::boolean(),
        PropertyType::DateTime => Rule::DateTime,
        PropertyType::Date => Rule::Date,
        PropertyType::Enum => Rule::EnumValue,
        PropertyType::Uuid => Rule::Uuid,
        PropertyType::Array => Rule::Array {
            min_items: 0,
            items: None,
        },
        PropertyType::Object | PropertyType::Hashtable => Rule::Object(ObjectRule::open()),
    }
}

fn universal_constraints(ty: PropertyType) -> Vec<(&'static str, Rule)> {
    let mut keys = vec![("type", Rule::Any)];
    for flag in [
        "required",
        "mustNotBeMissing",
        "mustNotBeNull",
        "immutable",
        "immutableStrict",
        "immutableWhenSet",
        "immutableWhenSetStrict",
    ] {
        keys.push((flag, dynamic(Rule::boolean())));
    }
    keys.push(("mustEqual", dynamic(Rule::Nullable(Box::new(comparison_rule(ty))))));
    keys.push(("mustEqualStrict", dynamic(Rule::Nullable(Box::new(comparison_rule(ty))))));
    keys.push((
        "customValidation",
        Rule::Function {
            max_arity: PROPERTY_ARITY,
        },
    ));
    keys
}

fn range_constraints(bound: Rule) -> Vec<(&'static str, Rule)> {
    vec![
        ("minimumValue", dynamic(bound.clone())),
        ("minimumValueExclusive", dynamic(bound.clone())),
        ("maximumValue", dynamic(bound.clone())),
        ("maximumValueExclusive", dynamic(bound)),
    ]
}

fn numeric_range_constraints(number: NumberRule) -> Vec<(&'static str, Rule)> {
    vec![
        ("minimumValue", dynamic(number.clone().into())),
        ("minimumValueExclusive", dynamic(number.clone().into())),
        ("maximumValue", maximum_value(number.clone(), &MAXIMUM_INCLUSIVE_BOUNDS)),
        ("maximumValueExclusive", maximum_value(number, &MAXIMUM_EXCLUSIVE_BOUNDS)),
    ]
}

fn length_constraints() -> Vec<(&'static str, Rule)> {
    vec![
        ("mustNotBeEmpty", dynamic(Rule::boolean())),
        ("minimumLength", dynamic(NumberRule::integer().with_floor(0).into())),
        (
            "maximumLength",
            dynamic(NumberRule::integer().with_floor(0).with_siblings(&LENGTH_BOUNDS).into()),
        ),
    ]
}

fn type_specific_constraints(ty: PropertyType) -> Vec<(&'static str, Rule)> {
    match ty {
        PropertyType::String => {
            let mut keys = length_constraints();
            keys.push(("regexPattern", dynamic(Rule::Regex)));
            keys.extend(range_constraints(Rule::String { min_len: 0 }));
            keys
        }
        PropertyType::Integer => numeric_range_constraints(NumberRule::integer()),
        PropertyType::Float => numeric_range_constraints(NumberRule::number()),
        PropertyType::Boolean => Vec::new(),
        PropertyType::DateTime => range_constraints(Rule::DateTime),
        PropertyType::Date => range_constraints(Rule::Date),
        PropertyType::Uuid => range_constraints(Rule::Uuid),
        PropertyType::Enum => vec![(
            "predefinedValues",
            dynamic(Rule::Array {
                min_items: 1,
                items: Some(Box::new(Rule::EnumValue)),
            }),
        )],
        PropertyType::AttachmentReference => vec![
            (
                "maximumSize",
                dynamic(
                    NumberRule::integer()
                        .with_floor(1)
                        .with_ceiling(MAX_ATTACHMENT_SIZE as i64)
                        .into(),
                ),
            ),
            ("supportedExtensions", dynamic(Rule::strings(1, 0))),
            ("supportedContentTypes", dynamic(Rule::strings(1, 1))),
        ],
        PropertyType::Array => {
            let mut keys = length_constraints();
            keys.push(("arrayElementsValidator", dynamic(Rule::PropertyValidator)));
            keys
        }
        PropertyType::Object => vec![
            ("allowUnknownProperties", dynamic(Rule::boolean())),
            (
                "propertyValidators",
                dynamic(Rule::Map {
                    key_pattern: Some(Regex::new(r"^.+$").unwrap()),
                    min_entries: 1,
                    value: Box::new(Rule::PropertyValidator),
                }),
            ),
        ],
        PropertyType::Hashtable => vec![
            ("minimumSize", dynamic(NumberRule::integer().with_floor(0).into())),
            (
                "maximumSize",
                dynamic(NumberRule::integer().with_floor(0).with_siblings(&SIZE_BOUNDS).into()),
            ),
            (
                "hashtableKeysValidator",
                dynamic(Rule::Object(ObjectRule::new(vec![
                    ("mustNotBeEmpty", dynamic(Rule::boolean())),
                    ("regexPattern", dynamic(Rule::Regex)),
                ]))),
            ),
            ("hashtableValuesValidator", dynamic(Rule::PropertyValidator)),
        ],
    }
}

fn type_rule(ty: PropertyType) -> ObjectRule {
    let mut keys = universal_constraints(ty);
    keys.extend(type_specific_constraints(ty));
    let rule = ObjectRule::new(keys).with_without(&EXCLUSIONS);
    if ty == PropertyType::Enum {
        rule.with_required(&["predefinedValues"])
    } else {
        rule
    }
}

/// Object rule for validators of the given type
pub fn rule_for_type(ty: PropertyType) -> &'static ObjectRule {
    &TYPE_RULES[&ty]
}

/// Check one property validator node
///
/// The `type` is checked first, on its own: without a usable type there is
/// no way to tell which constraints are legal, so nothing else is reported.
/// A dynamic `type` accepts any constraints.
pub fn check_property_validator(checker: &mut Checker, field: &Field<'_>) {
    let Some(node) = field.value.as_object() else {
        checker.reject(field, "must be an object");
        return;
    };

    let type_path = field.path.property("type");
    let Some(ty) = node.get("type") else {
        checker.report(&type_path, "\"type\" is required");
        return;
    };
    let type_field = Field {
        value: ty,
        key: "type",
        path: &type_path,
        siblings: Some(node),
    };

    if let Some(func) = ty.as_function() {
        if func.arity() > PROPERTY_ARITY {
            checker.reject(
                &type_field,
                format!("must have an arity lesser or equal to {}", PROPERTY_ARITY),
            );
        }
        return;
    }

    match ty.as_str().and_then(PropertyType::from_name) {
        Some(ty) => checker.check_object(rule_for_type(ty), node, field),
        None => checker.reject(&type_field, format!("must be one of [{}]", *TYPE_NAMES)),
    }
}
