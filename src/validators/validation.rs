//! Validation infrastructure
//!
//! This module provides the traversal frame handed to dynamic constraints and
//! the per-call validation context that collects violations.

use serde_json::Value;
use std::collections::HashSet;

use super::report::{ItemPath, Violation};
use crate::error::Result;
use crate::limits::Limits;

// =============================================================================
// Traversal frames
// =============================================================================

/// One position of the traversal over a document/previous-document pair
///
/// Frames are immutable values that borrow only the documents. A child frame
/// is derived from its parent and owns its full path, so frames can wait on
/// the validator's work stack without borrowing each other.
#[derive(Debug, Clone)]
pub struct ItemFrame<'a> {
    /// Current value (`None` when the property is absent)
    pub value: Option<&'a Value>,
    /// Value at the same path in the previous revision
    pub old_value: Option<&'a Value>,
    /// Property name, `[index]` or `[key]`; empty at the root
    pub name: String,
    /// Full path from the document root
    pub path: ItemPath,
    /// Number of frames above this one
    pub depth: usize,
}

impl<'a> ItemFrame<'a> {
    /// Frame for the document itself
    pub fn root(doc: &'a Value, old_doc: Option<&'a Value>) -> Self {
        Self {
            value: Some(doc),
            old_value: old_doc,
            name: String::new(),
            path: ItemPath::root(),
            depth: 0,
        }
    }

    /// Frame for a named property of this (object) frame
    pub fn property(&self, name: &str) -> ItemFrame<'a> {
        ItemFrame {
            value: self.value.and_then(|v| v.get(name)),
            old_value: self.old_value.and_then(|v| v.get(name)),
            name: name.to_string(),
            path: self.path.property(name),
            depth: self.depth + 1,
        }
    }

    /// Frame for an element of this (array) frame, paired by index with the
    /// previous array
    pub fn element(&self, index: usize) -> ItemFrame<'a> {
        ItemFrame {
            value: self.value.and_then(|v| v.get(index)),
            old_value: self.old_value.and_then(|v| v.get(index)),
            name: format!("[{}]", index),
            path: self.path.element(index),
            depth: self.depth + 1,
        }
    }

    /// Frame for an entry of this (hashtable) frame
    pub fn entry(&self, key: &str) -> ItemFrame<'a> {
        ItemFrame {
            value: self.value.and_then(|v| v.get(key)),
            old_value: self.old_value.and_then(|v| v.get(key)),
            name: format!("[{}]", key),
            path: self.path.entry(key),
            depth: self.depth + 1,
        }
    }

}

// =============================================================================
// Validation context
// =============================================================================

/// State of one document validation
///
/// Owned by a single call: violations accumulate here in traversal order and
/// nothing is shared across calls.
#[derive(Debug)]
pub struct ValidationContext<'d> {
    /// The document being written
    pub doc: &'d Value,
    /// The previous revision, if any
    pub old_doc: Option<&'d Value>,
    /// Limits in effect
    pub limits: Limits,
    /// Collected violations
    pub violations: Vec<Violation>,
    /// Attachment names referenced by `attachmentReference` properties
    pub attachment_references: HashSet<String>,
}

impl<'d> ValidationContext<'d> {
    /// Create a new validation context
    pub fn new(doc: &'d Value, old_doc: Option<&'d Value>, limits: Limits) -> Self {
        Self {
            doc,
            old_doc,
            limits,
            violations: Vec::new(),
            attachment_references: HashSet::new(),
        }
    }

    /// Record a violation
    pub fn report(&mut self, path: &ItemPath, message: impl Into<String>) {
        self.violations.push(Violation::new(path.as_str(), message));
    }

    /// Whether the write replaces an existing, non-deleted revision
    pub fn is_replace(&self) -> bool {
        self.old_doc.is_some_and(|old| !is_deleted(old))
    }

    /// Whether the write deletes the document
    pub fn is_delete(&self) -> bool {
        is_deleted(self.doc)
    }

    /// Fail if a frame is nested deeper than the limits allow
    pub fn check_depth(&self, frame: &ItemFrame<'_>) -> Result<()> {
        self.limits.check_nesting_depth(frame.depth)
    }

    /// Consume the context, returning the violations
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// Whether a document revision is a deletion tombstone
pub fn is_deleted(doc: &Value) -> bool {
    doc.get("_deleted").and_then(Value::as_bool).unwrap_or(false)
}
