//! Limits for document validation
//!
//! Traversal depth is bounded by how deeply a document nests, and documents
//! arriving from a sync endpoint are already size-capped, so the limits here
//! are guard rails rather than tuning knobs.

use crate::error::{Error, Result};

/// Largest attachment the sync protocol accepts, in bytes (20 MiB)
pub const MAX_ATTACHMENT_SIZE: u64 = 20 * 1024 * 1024;

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of a validated document
    pub max_nesting_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nesting_depth: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_nesting_depth: 64,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_nesting_depth: 10000,
        }
    }

    /// Set the maximum nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Check if a nesting depth is within limits
    pub fn check_nesting_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_nesting_depth {
            Err(Error::LimitExceeded(format!(
                "document nesting depth {} exceeds maximum {}",
                depth, self.max_nesting_depth
            )))
        } else {
            Ok(())
        }
    }
}
