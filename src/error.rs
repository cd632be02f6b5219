//! Error types for syncschema
//!
//! Structural defects and validation violations are ordinary data and are
//! collected into lists (see [`crate::validators::report`]). The types in this
//! module cover the conditions that abort a call instead: configuration
//! defects in a definition, exceeded limits and rejected writes.

use crate::validators::report::DocumentRejection;
use thiserror::Error;

/// Result type alias using syncschema Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for syncschema operations
#[derive(Error, Debug)]
pub enum Error {
    /// A definition is broken in a way that makes validation meaningless
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationDefect),

    /// A document write was rejected; carries every violation found
    #[error("{0}")]
    InvalidDocument(#[from] DocumentRejection),

    /// No document definition claims the document
    #[error("Unknown document type")]
    UnknownDocumentType,

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A programming error in a document definition, found while validating a
/// document against it.
///
/// These are never aggregated: validation stops at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationDefect {
    /// The validator's `type` did not resolve to a member of the vocabulary
    #[error("No data type defined for validator of property \"{path}\"")]
    UnknownType {
        /// Path of the item being validated
        path: String,
    },

    /// A dynamic constraint declares more parameters than its position allows
    #[error("dynamic constraint \"{constraint}\" takes {arity} parameters but at most {max} are allowed")]
    ArityExceeded {
        /// Constraint name
        constraint: String,
        /// Declared arity of the callable
        arity: usize,
        /// Maximum arity for this position
        max: usize,
    },

    /// A constraint (or the result of a dynamic one) has the wrong shape
    #[error("constraint \"{constraint}\" of item \"{path}\" must be {expected}")]
    InvalidConstraint {
        /// Path of the item being validated
        path: String,
        /// Constraint name
        constraint: String,
        /// Description of the accepted shape
        expected: &'static str,
    },

    /// A definition is missing something the runtime cannot do without
    #[error("document definition \"{doc_type}\" is invalid: {reason}")]
    InvalidDefinition {
        /// Document type name
        doc_type: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigurationDefect {
    /// Shorthand for [`ConfigurationDefect::InvalidConstraint`]
    pub fn invalid_constraint(
        path: impl Into<String>,
        constraint: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        ConfigurationDefect::InvalidConstraint {
            path: path.into(),
            constraint: constraint.into(),
            expected,
        }
    }
}
