//! Document definition grammar
//!
//! The rule every top-level document definition is checked against.

use once_cell::sync::Lazy;
use regex::Regex;

use super::rules::{Checker, Field, NumberRule, ObjectRule, Rule, SiblingBound};
use crate::constraints::ConstraintScope;
use crate::limits::MAX_ATTACHMENT_SIZE;
use crate::values::SchemaValue;

const DEFINITION_ARITY: usize = ConstraintScope::Definition.max_arity();
const HOOK_ARITY: usize = ConstraintScope::Hook.max_arity();

/// Custom action events a definition may hook
pub const CUSTOM_ACTION_EVENTS: [&str; 6] = [
    "onTypeIdentificationSucceeded",
    "onAuthorizationSucceeded",
    "onValidationSucceeded",
    "onAccessAssignmentsSucceeded",
    "onExpiryAssignmentSucceeded",
    "onDocumentChannelAssignmentSucceeded",
];

static TOTAL_SIZE_BOUNDS: [SiblingBound; 1] = [SiblingBound {
    key: "maximumIndividualSize",
    exclusive: false,
}];

/// Expiry date strings must be complete, valid calendar date/times
static EXPIRY_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-(((0[13578]|1[02])-(0[1-9]|[12]\d|3[01]))|((0[469]|11)-(0[1-9]|[12]\d|30))|(02-(0[1-9]|[12]\d)))T([01]\d|2[0-3]):[0-5]\d:[0-5]\d(Z|[+-]([01]\d|2[0-3]):[0-5]\d)$",
    )
    .unwrap()
});

/// The document definition rule
pub static DEFINITION_RULE: Lazy<ObjectRule> = Lazy::new(|| ObjectRule {
    keys: vec![
        ("typeFilter", Rule::Function { max_arity: HOOK_ARITY }),
        ("allowUnknownProperties", dynamic(Rule::boolean())),
        ("immutable", dynamic(Rule::boolean())),
        ("cannotReplace", dynamic(Rule::boolean())),
        ("cannotDelete", dynamic(Rule::boolean())),
        (
            "documentIdRegexPattern",
            Rule::Regex.dynamic(ConstraintScope::DocumentId.max_arity()),
        ),
        ("allowAttachments", dynamic(Rule::Custom(check_allow_attachments))),
        ("attachmentConstraints", dynamic(Rule::Object(attachment_constraints_rule()))),
        ("channels", dynamic(Rule::Object(permissions_rule(true)))),
        ("authorizedRoles", dynamic(Rule::Object(permissions_rule(false)))),
        ("authorizedUsers", dynamic(Rule::Object(permissions_rule(false)))),
        (
            "accessAssignments",
            dynamic(Rule::Array {
                min_items: 0,
                items: Some(Box::new(Rule::Custom(check_access_assignment))),
            }),
        ),
        ("expiry", dynamic(Rule::Custom(check_expiry))),
        (
            "customActions",
            Rule::Object(
                ObjectRule::new(
                    CUSTOM_ACTION_EVENTS
                        .iter()
                        .map(|event| (*event, Rule::Function { max_arity: HOOK_ARITY }))
                        .collect(),
                )
                .with_min_keys(1),
            ),
        ),
        (
            "propertyValidators",
            dynamic(Rule::Map {
                key_pattern: Some(Regex::new(r"^[^_].*$").unwrap()),
                min_entries: 0,
                value: Box::new(Rule::PropertyValidator),
            }),
        ),
    ],
    required: &["typeFilter", "propertyValidators"],
    required_with: &[("allowAttachments", "attachmentConstraints")],
    min_keys: 0,
    allow_unknown: false,
    without: &[("immutable", &["cannotReplace", "cannotDelete"])],
    at_least_one_of: &["channels", "authorizedRoles", "authorizedUsers"],
});

fn dynamic(rule: Rule) -> Rule {
    rule.dynamic(DEFINITION_ARITY)
}

fn one_or_many_names(min_items: usize) -> Rule {
    Rule::OneOrMany {
        item: Box::new(Rule::String { min_len: 1 }),
        min_items,
    }
}

fn permissions_rule(with_view: bool) -> ObjectRule {
    let mut keys = Vec::new();
    if with_view {
        keys.push(("view", one_or_many_names(0)));
    }
    for operation in ["add", "replace", "remove", "write"] {
        keys.push((operation, one_or_many_names(0)));
    }
    ObjectRule::new(keys).with_min_keys(1)
}

fn attachment_constraints_rule() -> ObjectRule {
    ObjectRule::new(vec![
        ("requireAttachmentReferences", dynamic(Rule::boolean())),
        (
            "maximumAttachmentCount",
            dynamic(NumberRule::integer().with_floor(1).into()),
        ),
        (
            "maximumIndividualSize",
            dynamic(
                NumberRule::integer()
                    .with_floor(1)
                    .with_ceiling(MAX_ATTACHMENT_SIZE as i64)
                    .into(),
            ),
        ),
        (
            "maximumTotalSize",
            dynamic(
                NumberRule::integer()
                    .with_floor(1)
                    .with_siblings(&TOTAL_SIZE_BOUNDS)
                    .into(),
            ),
        ),
        ("supportedExtensions", dynamic(Rule::strings(1, 0))),
        ("supportedContentTypes", dynamic(Rule::strings(1, 1))),
        ("filenameRegexPattern", dynamic(Rule::Regex)),
    ])
    .with_min_keys(1)
}

// =============================================================================
// Hand-written checks
// =============================================================================

/// `allowAttachments` must be `true` when `attachmentConstraints` is set
fn check_allow_attachments(checker: &mut Checker, field: &Field<'_>) {
    let constrained = field
        .siblings
        .is_some_and(|siblings| siblings.contains_key("attachmentConstraints"));
    let only = if constrained { Some(true) } else { None };
    checker.check(&Rule::Boolean { only }, field);
}

static ROLE_ASSIGNMENT: Lazy<ObjectRule> = Lazy::new(|| {
    ObjectRule::new(vec![
        ("type", Rule::Any),
        ("roles", dynamic(one_or_many_names(1))),
        ("users", dynamic(one_or_many_names(1))),
    ])
    .with_required(&["roles", "users"])
});

static CHANNEL_ASSIGNMENT: Lazy<ObjectRule> = Lazy::new(|| ObjectRule {
    at_least_one_of: &["roles", "users"],
    ..ObjectRule::new(vec![
        ("type", Rule::Any),
        ("channels", dynamic(one_or_many_names(1))),
        ("roles", dynamic(one_or_many_names(1))),
        ("users", dynamic(one_or_many_names(1))),
    ])
    .with_required(&["channels"])
});

/// An access assignment grants channels or roles to users and roles
fn check_access_assignment(checker: &mut Checker, field: &Field<'_>) {
    let Some(assignment) = field.value.as_object() else {
        checker.reject(field, "must be an object");
        return;
    };

    let rule = match assignment.get("type") {
        None | Some(SchemaValue::Null) => &*CHANNEL_ASSIGNMENT,
        Some(SchemaValue::String(kind)) if kind == "channel" => &*CHANNEL_ASSIGNMENT,
        Some(SchemaValue::String(kind)) if kind == "role" => &*ROLE_ASSIGNMENT,
        Some(other) => {
            let path = field.path.property("type");
            let type_field = Field {
                value: other,
                key: "type",
                path: &path,
                siblings: Some(assignment),
            };
            checker.reject(&type_field, "must be one of [channel, role]");
            return;
        }
    };
    checker.check_object(rule, assignment, field);
}

/// Expiry is an absolute date/time string, a date/time literal, or a
/// non-negative number of seconds
fn check_expiry(checker: &mut Checker, field: &Field<'_>) {
    match field.value {
        SchemaValue::String(_) => checker.check(&Rule::Pattern(EXPIRY_DATE.clone()), field),
        SchemaValue::Number(_) => checker.check(&NumberRule::integer().with_floor(0).into(), field),
        SchemaValue::DateTime(_) => {}
        _ => checker.reject(field, "must be a date"),
    }
}
