//! Document Validation Example
//!
//! This example checks a small set of document definitions and then
//! validates a few document writes against them.
//!
//! Run with: cargo run --example validate_document

use serde_json::{json, Value};
use syncschema::values::SchemaFn;
use syncschema::{schema, DocumentDefinitions, Error, SchemaValue};

fn definitions() -> SchemaValue {
    schema!({
        "invoice": {
            "typeFilter": (SchemaFn::type_filter(|doc, old, _| {
                let doc = old.unwrap_or(doc);
                doc["_id"].as_str().is_some_and(|id| id.starts_with("invoice."))
            })),
            "authorizedRoles": { "add": "billing", "replace": "billing", "remove": "admin" },
            "cannotDelete": true,
            "allowAttachments": true,
            "attachmentConstraints": {
                "maximumAttachmentCount": 2,
                "supportedExtensions": ["pdf"],
                "requireAttachmentReferences": true
            },
            "propertyValidators": {
                "number": { "type": "string", "required": true, "immutable": true, "regexPattern": (regex::Regex::new(r"^INV-\d+$").unwrap()) },
                "issued": { "type": "date", "required": true },
                "total": { "type": "float", "minimumValue": 0 },
                "scan": { "type": "attachmentReference", "supportedContentTypes": ["application/pdf"] },
                "lines": {
                    "type": "array",
                    "mustNotBeEmpty": true,
                    "arrayElementsValidator": {
                        "type": "object",
                        "propertyValidators": {
                            "sku": { "type": "string", "required": true },
                            "quantity": { "type": "integer", "minimumValueExclusive": 0 }
                        }
                    }
                }
            }
        }
    })
}

fn report(label: &str, result: Result<String, Error>) {
    println!("{}", label);
    match result {
        Ok(doc_type) => println!("  Result: valid {} document\n", doc_type),
        Err(Error::InvalidDocument(rejection)) => {
            println!("  Result: rejected");
            for violation in &rejection.violations {
                println!("  - {}", violation);
            }
            println!();
        }
        Err(err) => println!("  Result: {}\n", err),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let raw = definitions();

    let defects = syncschema::validate_definitions(&raw);
    println!("Definitions checked: {} defect(s)\n", defects.len());
    for defect in &defects {
        println!("  - {}", defect);
    }

    let registry = DocumentDefinitions::from_raw(&raw)?;

    let created: Value = json!({
        "_id": "invoice.1",
        "number": "INV-1",
        "issued": "2024-03-01",
        "total": 12.5,
        "scan": "invoice.pdf",
        "lines": [{ "sku": "A-1", "quantity": 2 }]
    });
    report("Creating an invoice", registry.validate_write(&created, None));

    let updated = json!({
        "_id": "invoice.1",
        "number": "INV-2",
        "issued": "March 1st",
        "lines": [{ "quantity": 0 }],
        "_attachments": {
            "invoice.pdf": { "content_type": "image/png", "length": 5120 },
            "notes.txt": { "content_type": "text/plain", "length": 64 }
        }
    });
    report("Updating the invoice", registry.validate_write(&updated, Some(&created)));

    let deleted = json!({ "_id": "invoice.1", "_deleted": true });
    report("Deleting the invoice", registry.validate_write(&deleted, Some(&created)));

    let unknown = json!({ "_id": "receipt.1" });
    report("Writing an unknown document", registry.validate_write(&unknown, None));

    Ok(())
}
