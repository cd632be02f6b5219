//! Constraint resolution
//!
//! Every constraint in a definition is a [`SchemaValue`]: either a literal or
//! a [`SchemaFn`](crate::values::SchemaFn) computed from the document being
//! validated. [`resolve`] is the one place where the two are told apart, and
//! both the runtime validator and the meta-schema grammar use
//! [`ConstraintScope`] to agree on how many parameters a callable may take in
//! a given position.
//!
//! Results are never cached: a callable is invoked again on every use.

use std::borrow::Cow;

use regex::Regex;
use tracing::warn;

use crate::error::{ConfigurationDefect, Result};
use crate::values::{CallContext, SchemaMap, SchemaValue};

/// Position of a callable within a definition, which caps its arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintScope {
    /// The definitions factory: no parameters
    Factory,
    /// `documentIdRegexPattern`: the document only
    DocumentId,
    /// Definition-level constraints: document and previous document
    Definition,
    /// `typeFilter` and custom action hooks: three parameters
    Hook,
    /// Property-level constraints: document pair and item pair
    Property,
}

impl ConstraintScope {
    /// Largest arity accepted in this position
    pub const fn max_arity(self) -> usize {
        match self {
            ConstraintScope::Factory => 0,
            ConstraintScope::DocumentId => 1,
            ConstraintScope::Definition => 2,
            ConstraintScope::Hook => 3,
            ConstraintScope::Property => 4,
        }
    }
}

/// Resolve a constraint to its effective value
///
/// Literals are returned borrowed; callables are invoked with `ctx`. A
/// callable whose arity exceeds the scope's cap is a configuration defect.
pub fn resolve<'c>(
    name: &str,
    constraint: &'c SchemaValue,
    scope: ConstraintScope,
    ctx: &CallContext<'_>,
) -> Result<Cow<'c, SchemaValue>> {
    match constraint {
        SchemaValue::Function(func) => {
            let max = scope.max_arity();
            if func.arity() > max {
                warn!(constraint = name, arity = func.arity(), max, "dynamic constraint arity exceeded");
                return Err(ConfigurationDefect::ArityExceeded {
                    constraint: name.to_string(),
                    arity: func.arity(),
                    max,
                }
                .into());
            }
            Ok(Cow::Owned(func.call(ctx)))
        }
        literal => Ok(Cow::Borrowed(literal)),
    }
}

/// The constraints of one definition node, bound to a call context
///
/// Lookups resolve the named constraint and convert it to the shape the
/// caller needs. A key that is absent, or that resolves to `null`, counts as
/// not set.
#[derive(Debug, Clone, Copy)]
pub struct Constraints<'c, 'a> {
    node: &'c SchemaMap,
    scope: ConstraintScope,
    ctx: CallContext<'a>,
    path: &'a str,
}

impl<'c, 'a> Constraints<'c, 'a> {
    /// Bind a node to a context; `path` is used in defect messages
    pub fn new(node: &'c SchemaMap, scope: ConstraintScope, ctx: CallContext<'a>, path: &'a str) -> Self {
        Self {
            node,
            scope,
            ctx,
            path,
        }
    }

    /// The call context constraints are resolved with
    pub fn context(&self) -> &CallContext<'a> {
        &self.ctx
    }

    /// Whether the node declares the constraint at all
    pub fn contains(&self, name: &str) -> bool {
        self.node.contains_key(name)
    }

    /// Resolved value of a constraint
    pub fn get(&self, name: &str) -> Result<Option<Cow<'c, SchemaValue>>> {
        match self.node.get(name) {
            None => Ok(None),
            Some(constraint) => {
                let resolved = resolve(name, constraint, self.scope, &self.ctx)?;
                Ok(if resolved.is_null() { None } else { Some(resolved) })
            }
        }
    }

    /// Resolved value of a constraint, keeping an explicit `null`
    ///
    /// Used by the equality family, where `null` is a meaningful expectation.
    pub fn get_nullable(&self, name: &str) -> Result<Option<Cow<'c, SchemaValue>>> {
        match self.node.get(name) {
            None => Ok(None),
            Some(constraint) => resolve(name, constraint, self.scope, &self.ctx).map(Some),
        }
    }

    /// A boolean switch; unset means `false`
    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name)? {
            None => Ok(false),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| self.invalid(name, "a boolean")),
        }
    }

    /// A non-negative integer
    pub fn size(&self, name: &str) -> Result<Option<u64>> {
        match self.get(name)? {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|n| u64::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(name, "a non-negative integer")),
        }
    }

    /// A compiled regular expression
    pub fn regex(&self, name: &str) -> Result<Option<Cow<'c, Regex>>> {
        match self.get(name)? {
            None => Ok(None),
            Some(Cow::Borrowed(SchemaValue::Regex(re))) => Ok(Some(Cow::Borrowed(re))),
            Some(Cow::Owned(SchemaValue::Regex(re))) => Ok(Some(Cow::Owned(re))),
            Some(_) => Err(self.invalid(name, "a regular expression")),
        }
    }

    /// A list of strings
    pub fn strings(&self, name: &str) -> Result<Option<Vec<String>>> {
        match self.get(name)? {
            None => Ok(None),
            Some(value) => value
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .map(Some)
                .ok_or_else(|| self.invalid(name, "a list of strings")),
        }
    }

    /// A nested definition object
    pub fn object(&self, name: &str) -> Result<Option<Cow<'c, SchemaValue>>> {
        match self.get(name)? {
            None => Ok(None),
            Some(value) if value.as_object().is_some() => Ok(Some(value)),
            Some(_) => Err(self.invalid(name, "an object")),
        }
    }

    fn invalid(&self, name: &str, expected: &'static str) -> crate::error::Error {
        ConfigurationDefect::invalid_constraint(self.path, name, expected).into()
    }
}
