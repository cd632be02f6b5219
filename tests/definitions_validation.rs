//! Definition grammar tests over whole definition sets

mod samples;

use chrono::DateTime;
use pretty_assertions::assert_eq;
use regex::Regex;
use syncschema::values::SchemaFn;
use syncschema::{schema, validate_definitions, DocumentDefinitions, SchemaValue};

fn sorted_defects(raw: &SchemaValue) -> Vec<String> {
    let mut defects: Vec<String> = validate_definitions(raw).iter().map(ToString::to_string).collect();
    defects.sort();
    defects
}

fn sorted(expected: &[&str]) -> Vec<String> {
    let mut expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
    expected.sort();
    expected
}

#[test]
fn test_sample_definitions_have_no_defects() {
    let defects = validate_definitions(&samples::sample_definitions());
    assert_eq!(defects, vec![]);

    let registry = DocumentDefinitions::from_raw(&samples::sample_definitions()).unwrap();
    assert!(registry.defects().is_empty());
}

#[test]
fn test_definitions_object() {
    let definitions = schema!({
        "myDoc1": {
            "allowUnknownProperties": 1,
            "immutable": true,
            "cannotDelete": true,
            "attachmentConstraints": (SchemaFn::binary(|_, _| SchemaValue::Null)),
            "customActions": {
                "onTypeIdentificationSucceeded": (SchemaFn::item(|_, _, _, _| SchemaValue::Null)),
                "onAuthorizationSucceeded": 5,
                "invalidEvent": (SchemaFn::new(3, |_| SchemaValue::Null))
            }
        }
    });

    assert_eq!(
        sorted_defects(&definitions),
        sorted(&[
            "myDoc1: \"value\" must contain at least one of [channels, authorizedRoles, authorizedUsers]",
            "myDoc1.typeFilter: \"typeFilter\" is required",
            "myDoc1.propertyValidators: \"propertyValidators\" is required",
            "myDoc1.allowUnknownProperties: \"allowUnknownProperties\" must be a boolean",
            "myDoc1.immutable: \"immutable\" conflict with forbidden peer \"cannotDelete\"",
            "myDoc1.allowAttachments: \"allowAttachments\" is required",
            "myDoc1.customActions.onTypeIdentificationSucceeded: \"onTypeIdentificationSucceeded\" must have an arity lesser or equal to 3",
            "myDoc1.customActions.onAuthorizationSucceeded: \"onAuthorizationSucceeded\" must be a Function",
            "myDoc1.customActions.invalidEvent: \"invalidEvent\" is not allowed",
        ])
    );
}

fn broken_definitions() -> SchemaValue {
    let lowercase_pattern = || SchemaValue::from(Regex::new("^[a-z]+$").unwrap());
    schema!({
        "myDoc1": {
            "typeFilter": (SchemaFn::nullary(|| SchemaValue::Null)),
            "channels": {},
            "authorizedRoles": {},
            "authorizedUsers": {},
            "immutable": true,
            "cannotReplace": false,
            "allowAttachments": false,
            "attachmentConstraints": {
                "maximumAttachmentCount": 0,
                "maximumIndividualSize": 20971521,
                "maximumTotalSize": 20971520,
                "supportedExtensions": (SchemaFn::new(3, |_| schema!([]))),
                "supportedContentTypes": []
            },
            "customActions": {},
            "propertyValidators": {
                "_invalidName": { "type": "string" },
                "nestedObject": {
                    "type": "object",
                    "unrecognizedConstraint": true,
                    "propertyValidators": {
                        "dateProperty": {
                            "type": "date",
                            "required": true,
                            "immutable": true,
                            "immutableWhenSet": false,
                            "minimumValue": "2018-01-31T17:31:27.283-08:00"
                        },
                        "hashtableProperty": {
                            "type": "hashtable",
                            "minimumSize": 2,
                            "maximumSize": 1,
                            "hashtableKeysValidator": { "regexPattern": "^[a-z]+$" },
                            "hashtableValuesValidator": {
                                "type": "datetime",
                                "maximumValueExclusive": (DateTime::parse_from_rfc3339("2018-01-31T17:31:27.283-08:00").unwrap()),
                                "mustEqual": "2018-01-31T17:31:27.283-08:00"
                            }
                        },
                        "arrayProperty": {
                            "type": "array",
                            "minimumLength": 3.5,
                            "maximumLength": 3.5,
                            "arrayElementsValidator": {
                                "type": "object",
                                "allowUnknownProperties": true,
                                "required": (SchemaFn::item(|_, _, _, old| (old == Some(&serde_json::Value::Bool(true))).into())),
                                "propertyValidators": {
                                    "stringProperty": {
                                        "type": "string",
                                        "regexPattern": (lowercase_pattern()),
                                        "minimumLength": (SchemaFn::nullary(|| 9.into())),
                                        "maximumLength": (-1)
                                    },
                                    "uuidProperty": {
                                        "type": "uuid",
                                        "minimumValue": "4050b662-4383-4d2E-8771-54d380d11C41",
                                        "maximumValue": "1234"
                                    },
                                    "noTypeProperty": { "required": true },
                                    "emptyPropertyValidatorsProperty": { "type": "object", "propertyValidators": {} }
                                }
                            }
                        },
                        "unrecognizedTypeProperty": { "type": "foobar" }
                    }
                }
            }
        }
    })
}

#[test]
fn test_definitions_factory() {
    let factory = SchemaValue::from(SchemaFn::nullary(broken_definitions));
    let nested = "myDoc1.propertyValidators.nestedObject.propertyValidators";

    let expected = [
        "myDoc1.channels: \"channels\" must have at least 1 children".to_string(),
        "myDoc1.authorizedRoles: \"authorizedRoles\" must have at least 1 children".to_string(),
        "myDoc1.authorizedUsers: \"authorizedUsers\" must have at least 1 children".to_string(),
        "myDoc1.immutable: \"immutable\" conflict with forbidden peer \"cannotReplace\"".to_string(),
        "myDoc1.allowAttachments: \"allowAttachments\" must be one of [true]".to_string(),
        "myDoc1.attachmentConstraints.maximumAttachmentCount: \"maximumAttachmentCount\" must be larger than or equal to 1".to_string(),
        "myDoc1.attachmentConstraints.maximumIndividualSize: \"maximumIndividualSize\" must be less than or equal to 20971520".to_string(),
        "myDoc1.attachmentConstraints.maximumTotalSize: \"maximumTotalSize\" must be larger than or equal to 20971521".to_string(),
        "myDoc1.attachmentConstraints.supportedExtensions: \"supportedExtensions\" must have an arity lesser or equal to 2".to_string(),
        "myDoc1.attachmentConstraints.supportedContentTypes: \"supportedContentTypes\" must contain at least 1 items".to_string(),
        "myDoc1.customActions: \"customActions\" must have at least 1 children".to_string(),
        "myDoc1.propertyValidators._invalidName: \"_invalidName\" is not allowed".to_string(),
        "myDoc1.propertyValidators.nestedObject.unrecognizedConstraint: \"unrecognizedConstraint\" is not allowed".to_string(),
        format!("{}.dateProperty.immutableWhenSet: \"immutableWhenSet\" conflict with forbidden peer \"immutable\"", nested),
        format!("{}.dateProperty.immutable: \"immutable\" conflict with forbidden peer \"immutableWhenSet\"", nested),
        format!(
            "{}.dateProperty.minimumValue: \"minimumValue\" with value \"2018-01-31T17:31:27.283-08:00\" fails to match the required pattern: /^(([0-9]{{4}})-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01]))$/",
            nested
        ),
        format!("{}.hashtableProperty.maximumSize: \"maximumSize\" must be larger than or equal to 2", nested),
        format!(
            "{}.hashtableProperty.hashtableKeysValidator.regexPattern: \"regexPattern\" must be a regular expression",
            nested
        ),
        format!(
            "{}.hashtableProperty.hashtableValuesValidator.maximumValueExclusive: \"maximumValueExclusive\" conflict with forbidden peer \"mustEqual\"",
            nested
        ),
        format!("{}.arrayProperty.minimumLength: \"minimumLength\" must be an integer", nested),
        format!("{}.arrayProperty.maximumLength: \"maximumLength\" must be an integer", nested),
        format!(
            "{}.arrayProperty.arrayElementsValidator.propertyValidators.stringProperty.maximumLength: \"maximumLength\" must be larger than or equal to 0",
            nested
        ),
        format!(
            "{}.arrayProperty.arrayElementsValidator.propertyValidators.uuidProperty.maximumValue: \"maximumValue\" must be a valid GUID",
            nested
        ),
        format!(
            "{}.arrayProperty.arrayElementsValidator.propertyValidators.noTypeProperty.type: \"type\" is required",
            nested
        ),
        format!(
            "{}.arrayProperty.arrayElementsValidator.propertyValidators.emptyPropertyValidatorsProperty.propertyValidators: \"propertyValidators\" must have at least 1 children",
            nested
        ),
        format!(
            "{}.unrecognizedTypeProperty.type: \"type\" must be one of [string, integer, float, boolean, datetime, date, enum, uuid, attachmentReference, array, object, hashtable]",
            nested
        ),
    ];
    let expected: Vec<&str> = expected.iter().map(String::as_str).collect();

    assert_eq!(sorted_defects(&factory), sorted(&expected));
}

#[test]
fn test_dynamic_type_accepts_any_constraints() {
    let definitions = schema!({
        "myDoc": {
            "typeFilter": (samples::id_prefix_filter("my.")),
            "channels": { "write": "c" },
            "propertyValidators": {
                "anything": {
                    "type": (SchemaFn::item(|_, _, value, _| {
                        if value.is_some_and(serde_json::Value::is_string) { "string".into() } else { "integer".into() }
                    })),
                    "made-up": true
                },
                "tooMany": { "type": (SchemaFn::new(5, |_| "string".into())) }
            }
        }
    });

    assert_eq!(
        sorted_defects(&definitions),
        vec!["myDoc.propertyValidators.tooMany.type: \"type\" must have an arity lesser or equal to 4".to_string()]
    );
}

#[test]
fn test_literal_bounds_must_be_ordered() {
    let definitions = schema!({
        "myDoc": {
            "typeFilter": (samples::id_prefix_filter("my.")),
            "authorizedUsers": { "add": "u" },
            "propertyValidators": {
                "count": { "type": "integer", "minimumValue": 10, "maximumValue": 9 },
                "ratio": { "type": "float", "minimumValueExclusive": 1, "maximumValueExclusive": 1 },
                "dynamicBound": {
                    "type": "integer",
                    "minimumValue": (SchemaFn::nullary(|| 10.into())),
                    "maximumValue": 9
                },
                "sizes": { "type": "hashtable", "minimumSize": 3, "maximumSize": 2 }
            }
        }
    });

    assert_eq!(
        sorted_defects(&definitions),
        sorted(&[
            "myDoc.propertyValidators.count.maximumValue: \"maximumValue\" must be larger than or equal to 10",
            "myDoc.propertyValidators.ratio.maximumValueExclusive: \"maximumValueExclusive\" must be greater than 1",
            "myDoc.propertyValidators.sizes.maximumSize: \"maximumSize\" must be larger than or equal to 3",
        ])
    );
}

#[test]
fn test_factory_with_parameters_is_a_defect() {
    let factory = SchemaValue::from(SchemaFn::unary(|_| samples::sample_definitions()));
    let defects = validate_definitions(&factory);
    assert_eq!(defects.len(), 1);
    assert!(defects[0].message.contains("\"definitions\""));
}
