//! Document definition registry
//!
//! [`DocumentDefinitions`] holds a set of document definitions keyed by
//! document type name. On every write it picks the definition that claims
//! the document (through its `typeFilter`) and validates the write against
//! it, folding every violation into one [`DocumentRejection`].

use serde_json::Value;
use tracing::{debug, info};

use crate::constraints::{resolve, ConstraintScope};
use crate::error::{ConfigurationDefect, Error, Result};
use crate::grammar::validate_definitions;
use crate::limits::Limits;
use crate::validators::document_validation::DocumentValidator;
use crate::validators::report::{Defect, DocumentRejection};
use crate::validators::validation::is_deleted;
use crate::values::{CallContext, SchemaMap, SchemaValue};

/// A set of document definitions
#[derive(Debug, Clone)]
pub struct DocumentDefinitions {
    definitions: SchemaMap,
    limits: Limits,
}

impl DocumentDefinitions {
    /// Build a registry from a definitions object, or from a factory taking
    /// no parameters that returns one
    pub fn from_raw(raw: &SchemaValue) -> Result<Self> {
        let null = Value::Null;
        let resolved = resolve("definitions", raw, ConstraintScope::Factory, &CallContext::document(&null, None))?;
        let Some(definitions) = resolved.as_object() else {
            return Err(ConfigurationDefect::InvalidDefinition {
                doc_type: String::new(),
                reason: format!("document definitions must be an object, found a {}", resolved.kind()),
            }
            .into());
        };
        debug!(definitions = definitions.len(), "document definitions loaded");
        Ok(Self {
            definitions: definitions.clone(),
            limits: Limits::default(),
        })
    }

    /// Use custom limits for document validation
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Names of the known document types, in declaration order
    pub fn doc_types(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Definition of a document type
    pub fn get(&self, doc_type: &str) -> Option<&SchemaValue> {
        self.definitions.get(doc_type)
    }

    /// Check the definitions against the definition grammar
    pub fn defects(&self) -> Vec<Defect> {
        validate_definitions(&SchemaValue::Object(self.definitions.clone()))
    }

    /// Find the type of a document
    ///
    /// Type filters are asked in declaration order and the first one to
    /// claim the document wins. A deletion carries no content of its own,
    /// so it is identified by its previous revision when there is one.
    pub fn identify_type(&self, doc: &Value, old_doc: Option<&Value>) -> Result<Option<&str>> {
        let old_doc = old_doc.filter(|old| !is_deleted(old));
        let subject = match old_doc {
            Some(old) if is_deleted(doc) => old,
            _ => doc,
        };

        for (doc_type, definition) in &self.definitions {
            let filter = definition
                .get("typeFilter")
                .filter(|filter| filter.is_function())
                .ok_or_else(|| ConfigurationDefect::InvalidDefinition {
                    doc_type: doc_type.clone(),
                    reason: "typeFilter must be a function".to_string(),
                })?;

            let ctx = CallContext::document(subject, old_doc).with_doc_type(doc_type);
            let matched = resolve("typeFilter", filter, ConstraintScope::Hook, &ctx)?;
            if matched.as_bool().unwrap_or(false) {
                debug!(doc_type = doc_type.as_str(), "document type identified");
                return Ok(Some(doc_type.as_str()));
            }
        }
        Ok(None)
    }

    /// Validate a document write
    ///
    /// Returns the document's type when the write is valid.
    pub fn validate_write(&self, doc: &Value, old_doc: Option<&Value>) -> Result<String> {
        let Some(doc_type) = self.identify_type(doc, old_doc)? else {
            info!("rejecting document of unknown type");
            return Err(Error::UnknownDocumentType);
        };
        let definition = self.get(doc_type).ok_or(Error::UnknownDocumentType)?;

        let violations = DocumentValidator::new(definition)
            .with_limits(self.limits.clone())
            .validate(doc, old_doc)?;
        if violations.is_empty() {
            return Ok(doc_type.to_string());
        }

        info!(doc_type, violations = violations.len(), "rejecting invalid document");
        Err(DocumentRejection::new(doc_type, violations).into())
    }
}
