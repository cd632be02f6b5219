//! Definition grammar
//!
//! Checks document definitions against the fixed grammar of constraints,
//! before they are ever used to validate a document. Every problem found is
//! reported as a [`Defect`]; checking never stops at the first one.
//!
//! ```
//! use syncschema::grammar::validate_definitions;
//! use syncschema::schema;
//! use syncschema::values::SchemaFn;
//!
//! let definitions = schema!({
//!     "note": {
//!         "typeFilter": (SchemaFn::type_filter(|doc, _, _| doc["kind"] == "note")),
//!         "channels": { "write": "notes" },
//!         "propertyValidators": {
//!             "kind": { "type": "string", "required": true },
//!             "text": { "type": "string", "maximumLength": (-1) }
//!         }
//!     }
//! });
//! let defects = validate_definitions(&definitions);
//! assert_eq!(defects.len(), 1);
//! assert_eq!(
//!     defects[0].to_string(),
//!     "note.propertyValidators.text.maximumLength: \"maximumLength\" must be larger than or equal to 0"
//! );
//! ```

pub mod definition;
pub mod property;
pub mod rules;

use serde_json::Value;
use tracing::{debug, warn};

use crate::constraints::{resolve, ConstraintScope};
use crate::validators::report::{Defect, ItemPath};
use crate::values::{CallContext, SchemaValue};

pub use definition::{CUSTOM_ACTION_EVENTS, DEFINITION_RULE};
pub use property::{check_property_validator, rule_for_type};
pub use rules::{Checker, Field, NumberRule, ObjectRule, Rule, SiblingBound};

/// Check a set of document definitions
///
/// `raw` maps document type names to definitions, or is a factory taking no
/// parameters that returns such a map.
pub fn validate_definitions(raw: &SchemaValue) -> Vec<Defect> {
    let null = Value::Null;
    let definitions = match resolve("definitions", raw, ConstraintScope::Factory, &CallContext::document(&null, None)) {
        Ok(definitions) => definitions,
        Err(err) => {
            warn!(error = %err, "definitions factory rejected");
            return vec![Defect::new("", err.to_string())];
        }
    };

    let Some(definitions) = definitions.as_object() else {
        return vec![Defect::new(
            "",
            format!("document definitions must be an object, found a {}", definitions.kind()),
        )];
    };

    let mut checker = Checker::new();
    for (doc_type, definition) in definitions {
        let path = ItemPath::from(doc_type.as_str());
        let field = Field::new(definition, doc_type, &path);
        match definition.as_object() {
            Some(map) => checker.check_object(&DEFINITION_RULE, map, &field),
            None => checker.reject(&field, "must be an object"),
        }
    }

    let defects = checker.into_defects();
    debug!(
        definitions = definitions.len(),
        defects = defects.len(),
        "document definitions checked"
    );
    defects
}
