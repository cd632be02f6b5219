//! Grammar rules
//!
//! A [`Rule`] describes the accepted shape of one value in a definition
//! tree. Rules are plain data, built once into process-wide tables, and
//! interpreted by a [`Checker`] that walks a definition alongside them and
//! records a [`Defect`] for every mismatch. The walk never stops early.
//!
//! Some rules depend on a value's siblings (e.g. `maximumLength` must not be
//! less than a literal `minimumLength`), so every check receives the object
//! the value was found in.

use regex::Regex;
use tracing::trace;

use super::property::check_property_validator;
use crate::validators::builtins::{is_uuid, DATETIME_CONSTRAINT, DATE_CONSTRAINT};
use crate::validators::report::{Defect, ItemPath};
use crate::values::{SchemaMap, SchemaValue};

// =============================================================================
// Rules
// =============================================================================

/// Accepted shape of a definition value
#[derive(Debug, Clone)]
pub enum Rule {
    /// Anything
    Any,
    /// A boolean, optionally restricted to one value
    Boolean {
        /// The only accepted value
        only: Option<bool>,
    },
    /// A number
    Number(NumberRule),
    /// A string
    String {
        /// Minimum length in characters
        min_len: usize,
    },
    /// One of a fixed list of strings
    OneOf(&'static [&'static str]),
    /// A string matching a pattern
    Pattern(Regex),
    /// A hyphenated UUID string
    Uuid,
    /// A compiled regular expression
    Regex,
    /// A date/time literal or a (possibly truncated) ISO-8601 string
    DateTime,
    /// A date literal or an ISO-8601 date-only string
    Date,
    /// A string or an integer
    EnumValue,
    /// A list
    Array {
        /// Minimum number of elements
        min_items: usize,
        /// Rule for every element
        items: Option<Box<Rule>>,
    },
    /// A single item or a list of items
    OneOrMany {
        /// Rule for the item(s)
        item: Box<Rule>,
        /// Minimum number of elements when a list is given
        min_items: usize,
    },
    /// `null`, or a value matching the inner rule
    Nullable(Box<Rule>),
    /// A callable
    Function {
        /// Largest accepted arity
        max_arity: usize,
    },
    /// A callable, or a literal matching the inner rule
    Dynamic {
        /// Rule for literals
        rule: Box<Rule>,
        /// Largest accepted arity for callables
        max_arity: usize,
    },
    /// An object with declared keys
    Object(ObjectRule),
    /// An object with arbitrary keys and uniform values
    Map {
        /// Pattern every key must match
        key_pattern: Option<Regex>,
        /// Minimum number of entries
        min_entries: usize,
        /// Rule for every value
        value: Box<Rule>,
    },
    /// A property validator (recursive reference to the property grammar)
    PropertyValidator,
    /// A hand-written check
    Custom(CustomCheck),
}

/// Signature of hand-written checks
pub type CustomCheck = fn(&mut Checker, &Field<'_>);

impl Rule {
    /// Wrap a rule so that a callable of up to `max_arity` parameters is also
    /// accepted
    pub fn dynamic(self, max_arity: usize) -> Rule {
        Rule::Dynamic {
            rule: Box::new(self),
            max_arity,
        }
    }

    /// A boolean with either value
    pub fn boolean() -> Rule {
        Rule::Boolean { only: None }
    }

    /// A list of strings with at least `min_items` elements
    pub fn strings(min_items: usize, min_len: usize) -> Rule {
        Rule::Array {
            min_items,
            items: Some(Box::new(Rule::String { min_len })),
        }
    }
}

/// Lower bound taken from a sibling constraint
#[derive(Debug, Clone, Copy)]
pub struct SiblingBound {
    /// Sibling key
    pub key: &'static str,
    /// Whether the value must be strictly greater than the sibling
    pub exclusive: bool,
}

/// Numeric rule
#[derive(Debug, Clone, Default)]
pub struct NumberRule {
    /// Only whole numbers
    pub integer: bool,
    /// Inclusive minimum
    pub floor: Option<i64>,
    /// Inclusive maximum
    pub ceiling: Option<i64>,
    /// Sibling bounds; the first one whose sibling is a literal number
    /// replaces `floor`
    pub siblings: &'static [SiblingBound],
}

impl NumberRule {
    /// Any number
    pub fn number() -> Self {
        Self::default()
    }

    /// Any whole number
    pub fn integer() -> Self {
        Self {
            integer: true,
            ..Self::default()
        }
    }

    /// Set the inclusive minimum
    pub fn with_floor(mut self, floor: i64) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Set the inclusive maximum
    pub fn with_ceiling(mut self, ceiling: i64) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    /// Set the sibling bounds
    pub fn with_siblings(mut self, siblings: &'static [SiblingBound]) -> Self {
        self.siblings = siblings;
        self
    }
}

impl From<NumberRule> for Rule {
    fn from(rule: NumberRule) -> Self {
        Rule::Number(rule)
    }
}

/// Rule for an object with declared keys
#[derive(Debug, Clone, Default)]
pub struct ObjectRule {
    /// Accepted keys and their rules, in declaration order
    pub keys: Vec<(&'static str, Rule)>,
    /// Keys that must be present
    pub required: &'static [&'static str],
    /// `(key, trigger)`: `key` must be present when `trigger` is
    pub required_with: &'static [(&'static str, &'static str)],
    /// Minimum number of keys
    pub min_keys: usize,
    /// Whether undeclared keys are accepted
    pub allow_unknown: bool,
    /// `(key, peers)`: `key` may not be present together with any of `peers`
    pub without: &'static [(&'static str, &'static [&'static str])],
    /// At least one of these keys must be present
    pub at_least_one_of: &'static [&'static str],
}

impl ObjectRule {
    /// An object with the given keys
    pub fn new(keys: Vec<(&'static str, Rule)>) -> Self {
        Self {
            keys,
            ..Self::default()
        }
    }

    /// An object accepting any keys
    pub fn open() -> Self {
        Self {
            allow_unknown: true,
            ..Self::default()
        }
    }

    /// Rule for a declared key
    pub fn rule_for(&self, key: &str) -> Option<&Rule> {
        self.keys.iter().find(|(k, _)| *k == key).map(|(_, rule)| rule)
    }

    /// Set the required keys
    pub fn with_required(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }

    /// Set the minimum number of keys
    pub fn with_min_keys(mut self, min_keys: usize) -> Self {
        self.min_keys = min_keys;
        self
    }

    /// Set the mutual exclusions
    pub fn with_without(mut self, without: &'static [(&'static str, &'static [&'static str])]) -> Self {
        self.without = without;
        self
    }
}

// =============================================================================
// Checker
// =============================================================================

/// A value under check, with its location
#[derive(Debug, Clone, Copy)]
pub struct Field<'v> {
    /// The value
    pub value: &'v SchemaValue,
    /// Label used in messages
    pub key: &'v str,
    /// Full location in the definition set
    pub path: &'v ItemPath,
    /// Object the value was found in
    pub siblings: Option<&'v SchemaMap>,
}

impl<'v> Field<'v> {
    /// Top-level field (no siblings)
    pub fn new(value: &'v SchemaValue, key: &'v str, path: &'v ItemPath) -> Self {
        Self {
            value,
            key,
            path,
            siblings: None,
        }
    }

    fn sibling(&self, key: &str) -> Option<&'v SchemaValue> {
        self.siblings.and_then(|s| s.get(key))
    }
}

/// Walks definitions against rules and collects defects
#[derive(Debug, Default)]
pub struct Checker {
    defects: Vec<Defect>,
}

impl Checker {
    /// Create a new checker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a defect
    pub fn report(&mut self, path: &ItemPath, message: impl Into<String>) {
        self.defects.push(Defect::new(path.as_str(), message));
    }

    /// Record a defect about a field, in `"key" reason` form
    pub fn reject(&mut self, field: &Field<'_>, reason: impl AsRef<str>) {
        let message = format!("\"{}\" {}", field.key, reason.as_ref());
        self.report(field.path, message);
    }

    /// Defects found so far
    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    /// Consume the checker, returning the defects
    pub fn into_defects(self) -> Vec<Defect> {
        self.defects
    }

    /// Check a field against a rule
    pub fn check(&mut self, rule: &Rule, field: &Field<'_>) {
        trace!(path = field.path.as_str(), "checking definition value");
        let value = field.value;
        match rule {
            Rule::Any => {}
            Rule::Boolean { only } => match (value.as_bool(), only) {
                (None, _) => self.reject(field, "must be a boolean"),
                (Some(b), Some(expected)) if b != *expected => {
                    self.reject(field, format!("must be one of [{}]", expected))
                }
                _ => {}
            },
            Rule::Number(number) => self.check_number(number, field),
            Rule::String { min_len } => match value.as_str() {
                None => self.reject(field, "must be a string"),
                Some(s) if s.chars().count() < *min_len => {
                    if *min_len == 1 {
                        self.reject(field, "is not allowed to be empty")
                    } else {
                        self.reject(field, format!("length must be at least {} characters long", min_len))
                    }
                }
                _ => {}
            },
            Rule::OneOf(options) => match value.as_str() {
                Some(s) if options.contains(&s) => {}
                _ => self.reject(field, format!("must be one of [{}]", options.join(", "))),
            },
            Rule::Pattern(pattern) => self.check_pattern(pattern, field),
            Rule::Uuid => {
                if !value.as_str().is_some_and(is_uuid) {
                    self.reject(field, "must be a valid GUID");
                }
            }
            Rule::Regex => {
                if value.as_regex().is_none() {
                    self.reject(field, "must be a regular expression");
                }
            }
            Rule::DateTime => match value {
                SchemaValue::DateTime(_) => {}
                SchemaValue::String(_) => self.check_pattern(&DATETIME_CONSTRAINT, field),
                _ => self.reject(field, "must be a date"),
            },
            Rule::Date => match value {
                SchemaValue::DateTime(_) => {}
                SchemaValue::String(_) => self.check_pattern(&DATE_CONSTRAINT, field),
                _ => self.reject(field, "must be a date"),
            },
            Rule::EnumValue => {
                if value.as_str().is_none() && value.as_i64().is_none() {
                    self.reject(field, "must be a string or an integer");
                }
            }
            Rule::Array { min_items, items } => self.check_array(*min_items, items.as_deref(), field),
            Rule::OneOrMany { item, min_items } => {
                if value.as_array().is_some() {
                    self.check_array(*min_items, Some(item), field);
                } else {
                    self.check(item, field);
                }
            }
            Rule::Nullable(inner) => {
                if !value.is_null() {
                    self.check(inner, field);
                }
            }
            Rule::Function { max_arity } => match value.as_function() {
                None => self.reject(field, "must be a Function"),
                Some(func) => self.check_arity(func.arity(), *max_arity, field),
            },
            Rule::Dynamic { rule, max_arity } => match value.as_function() {
                Some(func) => self.check_arity(func.arity(), *max_arity, field),
                None => self.check(rule, field),
            },
            Rule::Object(object) => match value.as_object() {
                None => self.reject(field, "must be an object"),
                Some(map) => self.check_object(object, map, field),
            },
            Rule::Map {
                key_pattern,
                min_entries,
                value: value_rule,
            } => match value.as_object() {
                None => self.reject(field, "must be an object"),
                Some(map) => {
                    if map.len() < *min_entries {
                        self.reject(field, format!("must have at least {} children", min_entries));
                    }
                    for (key, entry) in map {
                        let path = field.path.property(key);
                        let child = Field {
                            value: entry,
                            key,
                            path: &path,
                            siblings: Some(map),
                        };
                        if key_pattern.as_ref().is_some_and(|p| !p.is_match(key)) {
                            self.reject(&child, "is not allowed");
                        } else {
                            self.check(value_rule, &child);
                        }
                    }
                }
            },
            Rule::PropertyValidator => check_property_validator(self, field),
            Rule::Custom(check) => check(self, field),
        }
    }

    /// Check the keys of an object against an object rule
    pub fn check_object(&mut self, rule: &ObjectRule, map: &SchemaMap, field: &Field<'_>) {
        if !rule.at_least_one_of.is_empty() && !rule.at_least_one_of.iter().any(|k| map.contains_key(*k)) {
            self.report(
                field.path,
                format!("\"value\" must contain at least one of [{}]", rule.at_least_one_of.join(", ")),
            );
        }

        if map.len() < rule.min_keys {
            self.reject(field, format!("must have at least {} children", rule.min_keys));
        }

        for (key, value) in map {
            let path = field.path.property(key);
            let child = Field {
                value,
                key,
                path: &path,
                siblings: Some(map),
            };
            match rule.rule_for(key) {
                Some(key_rule) => self.check(key_rule, &child),
                None if rule.allow_unknown => {}
                None => self.reject(&child, "is not allowed"),
            }
        }

        let missing = rule
            .required
            .iter()
            .copied()
            .chain(
                rule.required_with
                    .iter()
                    .filter(|(_, trigger)| map.contains_key(*trigger))
                    .map(|(key, _)| *key),
            )
            .filter(|key| !map.contains_key(*key));
        for key in missing {
            self.report(&field.path.property(key), format!("\"{}\" is required", key));
        }

        for (key, peers) in rule.without {
            if !map.contains_key(*key) {
                continue;
            }
            if let Some(peer) = peers.iter().find(|peer| map.contains_key(**peer)) {
                self.report(
                    &field.path.property(key),
                    format!("\"{}\" conflict with forbidden peer \"{}\"", key, peer),
                );
            }
        }
    }

    fn check_number(&mut self, rule: &NumberRule, field: &Field<'_>) {
        let Some(n) = field.value.as_f64() else {
            self.reject(field, "must be a number");
            return;
        };
        if rule.integer && field.value.as_i64().is_none() {
            self.reject(field, "must be an integer");
            return;
        }

        let sibling = rule
            .siblings
            .iter()
            .find_map(|bound| field.sibling(bound.key).filter(|v| v.as_f64().is_some()).map(|v| (bound, v)));
        match sibling {
            Some((bound, limit)) => {
                let limit_value = limit.as_f64().unwrap_or_default();
                if bound.exclusive && n <= limit_value {
                    self.reject(field, format!("must be greater than {}", limit));
                } else if !bound.exclusive && n < limit_value {
                    self.reject(field, format!("must be larger than or equal to {}", limit));
                }
            }
            None => {
                if let Some(floor) = rule.floor {
                    if n < floor as f64 {
                        self.reject(field, format!("must be larger than or equal to {}", floor));
                    }
                }
            }
        }

        if let Some(ceiling) = rule.ceiling {
            if n > ceiling as f64 {
                self.reject(field, format!("must be less than or equal to {}", ceiling));
            }
        }
    }

    fn check_pattern(&mut self, pattern: &Regex, field: &Field<'_>) {
        match field.value.as_str() {
            None => self.reject(field, "must be a string"),
            Some(s) if !pattern.is_match(s) => self.reject(
                field,
                format!("with value \"{}\" fails to match the required pattern: /{}/", s, pattern.as_str()),
            ),
            _ => {}
        }
    }

    fn check_array(&mut self, min_items: usize, items: Option<&Rule>, field: &Field<'_>) {
        let Some(elements) = field.value.as_array() else {
            self.reject(field, "must be an array");
            return;
        };
        if elements.len() < min_items {
            self.reject(field, format!("must contain at least {} items", min_items));
        }
        let Some(items) = items else {
            return;
        };
        for (index, element) in elements.iter().enumerate() {
            let path = field.path.element(index);
            let child = Field {
                value: element,
                key: path.label(),
                path: &path,
                siblings: None,
            };
            self.check(items, &child);
        }
    }

    fn check_arity(&mut self, arity: usize, max_arity: usize, field: &Field<'_>) {
        if arity > max_arity {
            self.reject(field, format!("must have an arity lesser or equal to {}", max_arity));
        }
    }
}
