//! Validation reports
//!
//! Both validators describe problems as a path plus a message. Paths are
//! rendered as dot-separated property names, with `[index]` and `[key]`
//! suffixes for array elements and hashtable entries.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Paths
// =============================================================================

/// Location of an item within a document or a definition tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemPath(String);

impl ItemPath {
    /// The document (or definition set) itself
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Path of a named child property
    pub fn property(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    /// Path of an array element
    pub fn element(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// Path of a hashtable entry
    pub fn entry(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Rendered path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment, as it appears in defect messages
    pub fn label(&self) -> &str {
        match self.0.rfind(['.', '[']) {
            Some(idx) if self.0.as_bytes()[idx] == b'[' => &self.0[idx..],
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

// =============================================================================
// Violations and defects
// =============================================================================

/// A document content problem found by the runtime validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path of the offending item (empty for document-level problems)
    pub path: String,
    /// Complete human readable message
    pub message: String,
}

impl Violation {
    /// Create a new violation
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A document definition problem found by the meta-schema validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Defect {
    /// Path within the definition set, starting with the document type
    pub path: String,
    /// Description of the problem
    pub message: String,
}

impl Defect {
    /// Create a new defect
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A rejected document write, bundling every violation found
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Invalid {doc_type} document: {}", join_messages(.violations))]
pub struct DocumentRejection {
    /// Type of the rejected document
    pub doc_type: String,
    /// All violations, in traversal order
    pub violations: Vec<Violation>,
}

impl DocumentRejection {
    /// Create a rejection
    pub fn new(doc_type: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            doc_type: doc_type.into(),
            violations,
        }
    }

    /// The individual messages
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
