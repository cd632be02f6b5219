//! Constraining facets
//!
//! The bounds family of property constraints: value ranges, lengths and
//! hashtable sizes. Each facet knows the constraint name it is declared
//! under and renders its own violation message.

use serde_json::Value;
use std::fmt;

use super::builtins::{comparable, comparable_bound, Comparable, PropertyType};
use crate::constraints::Constraints;
use crate::error::{ConfigurationDefect, Result};

// =============================================================================
// Range facets
// =============================================================================

/// Inclusive and exclusive value bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFacet {
    /// `minimumValue`
    MinInclusive,
    /// `minimumValueExclusive`
    MinExclusive,
    /// `maximumValue`
    MaxInclusive,
    /// `maximumValueExclusive`
    MaxExclusive,
}

impl RangeFacet {
    /// Every range facet, in checking order
    pub const ALL: [RangeFacet; 4] = [
        RangeFacet::MinInclusive,
        RangeFacet::MinExclusive,
        RangeFacet::MaxInclusive,
        RangeFacet::MaxExclusive,
    ];

    /// Constraint name in definitions
    pub fn constraint_name(self) -> &'static str {
        match self {
            RangeFacet::MinInclusive => "minimumValue",
            RangeFacet::MinExclusive => "minimumValueExclusive",
            RangeFacet::MaxInclusive => "maximumValue",
            RangeFacet::MaxExclusive => "maximumValueExclusive",
        }
    }

    /// Whether `value` lies on the allowed side of `bound`
    ///
    /// Values that cannot be ordered against the bound are admitted; the
    /// type check reports them instead.
    pub fn admits(self, value: &Comparable, bound: &Comparable) -> bool {
        match value.partial_cmp(bound) {
            None => true,
            Some(ord) => match self {
                RangeFacet::MinInclusive => ord.is_ge(),
                RangeFacet::MinExclusive => ord.is_gt(),
                RangeFacet::MaxInclusive => ord.is_le(),
                RangeFacet::MaxExclusive => ord.is_lt(),
            },
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            RangeFacet::MinInclusive => "must not be less than",
            RangeFacet::MinExclusive => "must be greater than",
            RangeFacet::MaxInclusive => "must not be greater than",
            RangeFacet::MaxExclusive => "must be less than",
        }
    }

    /// Check a value against this facet's bound, if declared
    pub fn check(self, ty: PropertyType, value: &Value, constraints: &Constraints<'_, '_>, path: &str) -> Result<Option<String>> {
        let name = self.constraint_name();
        let Some(bound) = constraints.get(name)? else {
            return Ok(None);
        };
        let Some(actual) = comparable(ty, value) else {
            return Ok(None);
        };
        let limit = comparable_bound(ty, &bound).ok_or_else(|| {
            ConfigurationDefect::invalid_constraint(path, name, "comparable with the property type")
        })?;
        if self.admits(&actual, &limit) {
            Ok(None)
        } else {
            Ok(Some(format!("property \"{}\" {} {}", path, self.phrase(), bound)))
        }
    }
}

impl fmt::Display for RangeFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constraint_name())
    }
}

// =============================================================================
// Length and size facets
// =============================================================================

/// Lower and upper bounds on a count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountFacet {
    /// `minimumLength` of a string or array
    MinLength,
    /// `maximumLength` of a string or array
    MaxLength,
    /// `minimumSize` of a hashtable
    MinSize,
    /// `maximumSize` of a hashtable
    MaxSize,
}

impl CountFacet {
    /// Constraint name in definitions
    pub fn constraint_name(self) -> &'static str {
        match self {
            CountFacet::MinLength => "minimumLength",
            CountFacet::MaxLength => "maximumLength",
            CountFacet::MinSize => "minimumSize",
            CountFacet::MaxSize => "maximumSize",
        }
    }

    fn admits(self, count: u64, bound: u64) -> bool {
        match self {
            CountFacet::MinLength | CountFacet::MinSize => count >= bound,
            CountFacet::MaxLength | CountFacet::MaxSize => count <= bound,
        }
    }

    fn message(self, path: &str, bound: u64) -> String {
        match self {
            CountFacet::MinLength => format!("length of item \"{}\" must not be less than {}", path, bound),
            CountFacet::MaxLength => format!("length of item \"{}\" must not be greater than {}", path, bound),
            CountFacet::MinSize => format!("hashtable \"{}\" must not have fewer than {} entries", path, bound),
            CountFacet::MaxSize => format!("hashtable \"{}\" must not have more than {} entries", path, bound),
        }
    }

    /// Check a count against this facet's bound, if declared
    pub fn check(self, count: usize, constraints: &Constraints<'_, '_>, path: &str) -> Result<Option<String>> {
        match constraints.size(self.constraint_name())? {
            Some(bound) if !self.admits(count as u64, bound) => Ok(Some(self.message(path, bound))),
            _ => Ok(None),
        }
    }
}

/// Length of a value as the length facets see it
///
/// Strings count characters, arrays count elements; other values have no
/// length.
pub fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Whether a value is empty as `mustNotBeEmpty` sees it
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Apply every bounds-family constraint to a present value
///
/// Returns the violation messages in checking order.
pub fn check_bounds(ty: PropertyType, value: &Value, constraints: &Constraints<'_, '_>, path: &str) -> Result<Vec<String>> {
    let mut messages = Vec::new();

    if constraints.flag("mustNotBeEmpty")? && is_empty(value) {
        messages.push(format!("property \"{}\" must not be empty", path));
    }

    for facet in RangeFacet::ALL {
        if let Some(message) = facet.check(ty, value, constraints, path)? {
            messages.push(message);
        }
    }

    if let Some(length) = length_of(value) {
        for facet in [CountFacet::MinLength, CountFacet::MaxLength] {
            if let Some(message) = facet.check(length, constraints, path)? {
                messages.push(message);
            }
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintScope;
    use crate::schema;
    use crate::values::{CallContext, SchemaValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bounds(node: &SchemaValue, ty: PropertyType, value: Value) -> Result<Vec<String>> {
        let doc = json!({});
        let constraints = Constraints::new(
            node.as_object().unwrap(),
            ConstraintScope::Property,
            CallContext::document(&doc, None),
            "p",
        );
        check_bounds(ty, &value, &constraints, "p")
    }

    #[test]
    fn test_numeric_ranges() {
        let node = schema!({ "minimumValue": 1, "maximumValueExclusive": 10 });
        assert!(bounds(&node, PropertyType::Integer, json!(1)).unwrap().is_empty());
        assert_eq!(
            bounds(&node, PropertyType::Integer, json!(0)).unwrap(),
            vec!["property \"p\" must not be less than 1"]
        );
        assert_eq!(
            bounds(&node, PropertyType::Float, json!(10.0)).unwrap(),
            vec!["property \"p\" must be less than 10"]
        );
    }

    #[test]
    fn test_exclusive_minimum() {
        let node = schema!({ "minimumValueExclusive": 0, "maximumValue": 5 });
        assert_eq!(
            bounds(&node, PropertyType::Integer, json!(0)).unwrap(),
            vec!["property \"p\" must be greater than 0"]
        );
        assert_eq!(
            bounds(&node, PropertyType::Integer, json!(6)).unwrap(),
            vec!["property \"p\" must not be greater than 5"]
        );
    }

    #[test]
    fn test_string_ranges_are_lexicographic() {
        let node = schema!({ "minimumValue": "b", "maximumValue": "d" });
        assert!(bounds(&node, PropertyType::String, json!("c")).unwrap().is_empty());
        assert_eq!(bounds(&node, PropertyType::String, json!("a")).unwrap().len(), 1);
        assert_eq!(bounds(&node, PropertyType::String, json!("da")).unwrap().len(), 1);
    }

    #[test]
    fn test_datetime_ranges_are_chronological() {
        let node = schema!({ "minimumValue": "2018-01-01T00:00:00Z" });
        assert!(bounds(&node, PropertyType::DateTime, json!("2018-01-01T01:00:00+01:00"))
            .unwrap()
            .is_empty());
        assert_eq!(
            bounds(&node, PropertyType::DateTime, json!("2017-12-31T23:59:59.999Z")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_unorderable_value_is_left_to_type_check() {
        let node = schema!({ "minimumValue": 1 });
        assert!(bounds(&node, PropertyType::Integer, json!("abc")).unwrap().is_empty());
    }

    #[test]
    fn test_unorderable_bound_is_a_configuration_defect() {
        let node = schema!({ "minimumValue": true });
        assert!(bounds(&node, PropertyType::Integer, json!(3)).is_err());
    }

    #[test]
    fn test_lengths_and_emptiness() {
        let node = schema!({ "mustNotBeEmpty": true, "minimumLength": 2, "maximumLength": 3 });
        assert_eq!(
            bounds(&node, PropertyType::String, json!("")).unwrap(),
            vec![
                "property \"p\" must not be empty",
                "length of item \"p\" must not be less than 2",
            ]
        );
        assert_eq!(
            bounds(&node, PropertyType::Array, json!([1, 2, 3, 4])).unwrap(),
            vec!["length of item \"p\" must not be greater than 3"]
        );
        assert!(bounds(&node, PropertyType::String, json!("héé")).unwrap().is_empty());
    }

    #[test]
    fn test_hashtable_sizes() {
        let node = schema!({ "minimumSize": 1, "maximumSize": 2 });
        let doc = json!({});
        let constraints = Constraints::new(
            node.as_object().unwrap(),
            ConstraintScope::Property,
            CallContext::document(&doc, None),
            "t",
        );
        assert_eq!(
            CountFacet::MinSize.check(0, &constraints, "t").unwrap(),
            Some("hashtable \"t\" must not have fewer than 1 entries".to_string())
        );
        assert_eq!(
            CountFacet::MaxSize.check(3, &constraints, "t").unwrap(),
            Some("hashtable \"t\" must not have more than 2 entries".to_string())
        );
        assert_eq!(CountFacet::MaxSize.check(2, &constraints, "t").unwrap(), None);
    }
}
