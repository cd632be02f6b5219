//! # syncschema
//!
//! Declarative validation of JSON documents written through a sync function.
//!
//! Each document type is described by a *document definition*: a type filter
//! that recognises documents of the type, permission maps, document-level
//! rules, and a tree of property validators. This crate provides the two
//! halves of working with such definitions:
//!
//! - the **runtime document validator**, which checks a document write (the
//!   new revision and, for updates, the previous one) against a definition
//!   and collects every violation it finds;
//! - the **definition grammar**, which checks the definitions themselves and
//!   reports every structural defect before they are put to use.
//!
//! Constraints in a definition are either literals or callables computed
//! from the document being validated, so a definition can adapt to the
//! document (and describe recursive structures) without being expanded ahead
//! of time.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use syncschema::{schema, DocumentDefinitions, Error};
//! use syncschema::values::SchemaFn;
//!
//! let definitions = schema!({
//!     "profile": {
//!         "typeFilter": (SchemaFn::type_filter(|doc, old, _| {
//!             let doc = old.unwrap_or(doc);
//!             doc["_id"].as_str().is_some_and(|id| id.starts_with("profile."))
//!         })),
//!         "channels": { "write": "profiles" },
//!         "propertyValidators": {
//!             "name": { "type": "string", "required": true, "mustNotBeEmpty": true },
//!             "age": { "type": "integer", "minimumValue": 0 }
//!         }
//!     }
//! });
//! assert!(syncschema::validate_definitions(&definitions).is_empty());
//!
//! let registry = DocumentDefinitions::from_raw(&definitions)?;
//! let doc = json!({ "_id": "profile.alice", "name": "Alice", "age": 31 });
//! assert_eq!(registry.validate_write(&doc, None)?, "profile");
//!
//! let doc = json!({ "_id": "profile.bob", "age": -1 });
//! let Err(Error::InvalidDocument(rejection)) = registry.validate_write(&doc, None) else {
//!     panic!("expected a rejection");
//! };
//! assert_eq!(
//!     rejection.messages(),
//!     vec![
//!         "required property \"name\" is missing",
//!         "property \"age\" must not be less than 0",
//!     ]
//! );
//! # Ok::<(), syncschema::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraints;
pub mod definitions;
pub mod error;
pub mod grammar;
pub mod limits;
pub mod validators;
pub mod values;

// Re-exports for convenience
pub use constraints::{resolve, ConstraintScope, Constraints};
pub use definitions::DocumentDefinitions;
pub use error::{ConfigurationDefect, Error, Result};
pub use grammar::validate_definitions;
pub use limits::{Limits, MAX_ATTACHMENT_SIZE};
pub use validators::{
    validate_document, Defect, DocumentRejection, DocumentValidator, ItemPath, PropertyType, Violation,
};
pub use values::{CallContext, SchemaFn, SchemaMap, SchemaValue};

/// Version of the syncschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
