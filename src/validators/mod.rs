//! Document validators
//!
//! This module contains the runtime validation of document writes against
//! document definitions.

pub mod attachments;
pub mod builtins;
pub mod document_validation;
pub mod facets;
pub mod report;
pub mod validation;

// Re-exports
pub use builtins::PropertyType;
pub use document_validation::{validate_document, DocumentValidator, RESERVED_PROPERTIES};
pub use report::{Defect, DocumentRejection, ItemPath, Violation};
pub use validation::{ItemFrame, ValidationContext};
