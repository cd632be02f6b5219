//! Sample document definitions shared by the integration tests
//!
//! Between them the definitions use every property type, every constraint
//! and every document-level option, with both literal and dynamic values.

#![allow(dead_code)]

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;
use syncschema::values::SchemaFn;
use syncschema::{schema, SchemaValue};

/// Type filter matching documents whose `_id` starts with `prefix`
pub fn id_prefix_filter(prefix: &'static str) -> SchemaValue {
    SchemaFn::type_filter(move |doc, _, _| doc["_id"].as_str().is_some_and(|id| id.starts_with(prefix))).into()
}

fn regex(pattern: &str) -> SchemaValue {
    Regex::new(pattern).unwrap().into()
}

fn hook() -> SchemaValue {
    SchemaFn::new(3, |_| SchemaValue::Null).into()
}

/// The whole definition set
pub fn sample_definitions() -> SchemaValue {
    SchemaValue::object([
        ("business", business()),
        ("invoice", invoice()),
        ("notification", notification()),
        ("tree", tree()),
    ])
}

/// A business profile: literal property constraints of every type, dynamic
/// channels and attachment constraints
pub fn business() -> SchemaValue {
    schema!({
        "typeFilter": (id_prefix_filter("biz.")),
        "channels": (SchemaFn::binary(|doc, old| {
            let id = old.unwrap_or(doc)["_id"].as_str().unwrap_or_default().to_string();
            schema!({ "view": (format!("{}-view", id)), "write": [(format!("{}-edit", id)), "admin"] })
        })),
        "authorizedRoles": { "add": "admin", "replace": ["admin", "manager"], "remove": "admin" },
        "documentIdRegexPattern": (SchemaFn::unary(|_| regex(r"^biz\.\d+$"))),
        "allowAttachments": true,
        "attachmentConstraints": (SchemaFn::binary(|_, _| schema!({
            "requireAttachmentReferences": true,
            "maximumAttachmentCount": 2,
            "maximumIndividualSize": 1024,
            "maximumTotalSize": 2048,
            "supportedExtensions": ["png", "jpg", "pdf"],
            "supportedContentTypes": ["image/png", "image/jpeg", "application/pdf"],
            "filenameRegexPattern": (regex(r"^[a-z0-9_-]+\.[a-z]+$"))
        }))),
        "accessAssignments": [
            { "type": "role", "roles": "viewer", "users": (SchemaFn::binary(|doc, _| doc["owner"].clone().into())) },
            { "channels": "biz-feed", "roles": ["viewer"] }
        ],
        "expiry": "2030-12-31T23:59:59Z",
        "customActions": {
            "onValidationSucceeded": (hook()),
            "onDocumentChannelAssignmentSucceeded": (hook())
        },
        "propertyValidators": {
            "name": { "type": "string", "required": true, "mustNotBeEmpty": true, "maximumLength": 40 },
            "code": {
                "type": "string",
                "regexPattern": (regex(r"^[A-Z]{3,10}$")),
                "minimumLength": 3,
                "maximumLength": 10,
                "immutableWhenSet": true
            },
            "founded": {
                "type": "date",
                "minimumValue": "1900-01-01",
                "maximumValue": (DateTime::parse_from_rfc3339("2100-01-01T00:00:00Z").unwrap())
            },
            "employees": { "type": "integer", "minimumValue": 0, "maximumValue": 100000 },
            "rating": { "type": "float", "minimumValueExclusive": 0, "maximumValue": 5 },
            "active": { "type": "boolean", "mustNotBeNull": true },
            "logo": {
                "type": "attachmentReference",
                "maximumSize": 1024,
                "supportedExtensions": ["png", "jpg"],
                "supportedContentTypes": ["image/png", "image/jpeg"]
            },
            "address": {
                "type": "object",
                "allowUnknownProperties": false,
                "propertyValidators": {
                    "street": { "type": "string" },
                    "city": { "type": "string", "required": true },
                    "postalCode": { "type": "string", "regexPattern": (regex(r"^[A-Z]\d[A-Z] \d[A-Z]\d$")) },
                    "country": { "type": "enum", "predefinedValues": ["CA", "US", 1] }
                }
            },
            "tags": {
                "type": "array",
                "maximumLength": 5,
                "arrayElementsValidator": { "type": "string", "mustNotBeEmpty": true }
            },
            "contacts": {
                "type": "hashtable",
                "minimumSize": 1,
                "maximumSize": 3,
                "hashtableKeysValidator": { "mustNotBeEmpty": true, "regexPattern": (regex("^[a-z]+$")) },
                "hashtableValuesValidator": { "type": "uuid" }
            },
            "createdAt": { "type": "datetime", "immutableStrict": true, "minimumValue": "2000-01-01T00:00:00Z" },
            "owner": { "type": "string", "mustNotBeMissing": true }
        }
    })
}

fn invoice_validators() -> SchemaValue {
    schema!({
        "kind": { "type": "string", "mustEqualStrict": "invoice" },
        "status": { "type": "enum", "required": true, "predefinedValues": ["draft", "sent", "paid"] },
        "amount": { "type": "float", "mustNotBeMissing": true, "minimumValue": 0 },
        "currency": { "type": "string", "mustEqual": "CAD" },
        "revision": { "type": "integer", "immutableWhenSetStrict": true },
        "issuerId": { "type": "uuid", "immutable": true },
        "lineItems": {
            "type": "array",
            "mustNotBeEmpty": true,
            "minimumLength": 1,
            "arrayElementsValidator": {
                "type": "object",
                "propertyValidators": {
                    "sku": { "type": "string", "required": true },
                    "quantity": {
                        "type": "integer",
                        "minimumValueExclusive": 0,
                        "customValidation": (SchemaFn::item(|_, _, value, _| {
                            if value.and_then(Value::as_i64).is_some_and(|quantity| quantity > 100) {
                                "quantity must not exceed 100 per line".into()
                            } else {
                                SchemaValue::Null
                            }
                        }))
                    }
                }
            }
        },
        "discount": {
            "type": "float",
            "minimumValue": 0,
            "maximumValueExclusive": (SchemaFn::item(|doc, _, _, _| doc["amount"].clone().into()))
        }
    })
}

/// An invoice: dynamic root validators and document-level rules
pub fn invoice() -> SchemaValue {
    schema!({
        "typeFilter": (id_prefix_filter("inv.")),
        "authorizedUsers": { "write": ["alice", "bob"] },
        "cannotDelete": true,
        "cannotReplace": (SchemaFn::binary(|_, old| {
            SchemaValue::Bool(old.is_some_and(|old| old["status"] == "paid"))
        })),
        "propertyValidators": (SchemaFn::binary(|_, _| invoice_validators()))
    })
}

/// A notification: immutable documents
pub fn notification() -> SchemaValue {
    schema!({
        "typeFilter": (id_prefix_filter("note.")),
        "channels": { "view": "notes", "add": "notes" },
        "immutable": true,
        "propertyValidators": {
            "message": { "type": "string", "required": true },
            "recipientId": { "type": "uuid", "required": true },
            "priority": { "type": "integer", "minimumValue": 1, "maximumValue": 5 },
            "sentAt": { "type": "datetime", "maximumValueExclusive": "2100-01-01T00:00:00Z" }
        }
    })
}

/// Validator of one tree node; children are validated by the same node,
/// built lazily as the document is walked
pub fn tree_node() -> SchemaValue {
    schema!({
        "type": "object",
        "propertyValidators": {
            "label": { "type": "string", "required": true },
            "children": {
                "type": "array",
                "arrayElementsValidator": (SchemaFn::new(4, |_| tree_node()))
            }
        }
    })
}

/// A tree of arbitrary depth
pub fn tree() -> SchemaValue {
    schema!({
        "typeFilter": (id_prefix_filter("tree.")),
        "channels": { "write": "trees" },
        "allowUnknownProperties": false,
        "propertyValidators": { "root": (tree_node()) }
    })
}
