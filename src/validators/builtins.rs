//! Built-in property types
//!
//! The type vocabulary of document definitions is fixed and closed. This
//! module defines it, along with the fixed ISO-8601 and UUID patterns and the
//! value semantics each type brings: what counts as a value of the type, how
//! two values are ordered and when they are equal.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::values::SchemaValue;

// =============================================================================
// Type vocabulary
// =============================================================================

/// The closed set of property validator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// Any string
    String,
    /// Whole number
    Integer,
    /// Any number
    Float,
    /// `true` or `false`
    Boolean,
    /// ISO-8601 date with optional time and offset
    DateTime,
    /// ISO-8601 calendar date
    Date,
    /// One of a list of strings or integers
    Enum,
    /// Hyphenated hexadecimal UUID
    Uuid,
    /// Name of a file attached to the document
    AttachmentReference,
    /// List of elements
    Array,
    /// Object with declared properties
    Object,
    /// Object used as a map with arbitrary keys
    Hashtable,
}

impl PropertyType {
    /// Every type, in declaration order
    pub const ALL: [PropertyType; 12] = [
        PropertyType::String,
        PropertyType::Integer,
        PropertyType::Float,
        PropertyType::Boolean,
        PropertyType::DateTime,
        PropertyType::Date,
        PropertyType::Enum,
        PropertyType::Uuid,
        PropertyType::AttachmentReference,
        PropertyType::Array,
        PropertyType::Object,
        PropertyType::Hashtable,
    ];

    /// Look up a type by its name in definitions
    pub fn from_name(name: &str) -> Option<Self> {
        TYPES_BY_NAME.get(name).copied()
    }

    /// Name of the type in definitions
    pub fn name(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::DateTime => "datetime",
            PropertyType::Date => "date",
            PropertyType::Enum => "enum",
            PropertyType::Uuid => "uuid",
            PropertyType::AttachmentReference => "attachmentReference",
            PropertyType::Array => "array",
            PropertyType::Object => "object",
            PropertyType::Hashtable => "hashtable",
        }
    }

    /// Whether a document value has this type's native shape
    ///
    /// This is the type check the runtime validator applies before any
    /// type-specific constraint.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            PropertyType::String | PropertyType::AttachmentReference => value.is_string(),
            PropertyType::Integer => is_integer(value),
            PropertyType::Float => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::DateTime => value.as_str().is_some_and(is_iso8601_datetime),
            PropertyType::Date => value.as_str().is_some_and(is_iso8601_date),
            PropertyType::Enum => value.is_string() || is_integer(value),
            PropertyType::Uuid => value.as_str().is_some_and(is_uuid),
            PropertyType::Array => value.is_array(),
            PropertyType::Object | PropertyType::Hashtable => value.is_object(),
        }
    }

    /// Message fragment describing the expected shape
    pub fn expectation(self) -> &'static str {
        match self {
            PropertyType::String => "must be a string",
            PropertyType::Integer => "must be an integer",
            PropertyType::Float => "must be a floating point number",
            PropertyType::Boolean => "must be a boolean",
            PropertyType::DateTime => "must be an ISO 8601 date/time string",
            PropertyType::Date => "must be an ISO 8601 date-only string",
            PropertyType::Enum => "must be a string or integer",
            PropertyType::Uuid => "must be a UUID string",
            PropertyType::AttachmentReference => "must be a string",
            PropertyType::Array => "must be an array",
            PropertyType::Object => "must be an object",
            PropertyType::Hashtable => "must be an object/hashtable",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

lazy_static::lazy_static! {
    /// Types indexed by their definition name
    static ref TYPES_BY_NAME: HashMap<&'static str, PropertyType> = {
        let mut m = HashMap::new();
        for ty in PropertyType::ALL {
            m.insert(ty.name(), ty);
        }
        m
    };
}

// =============================================================================
// Fixed patterns
// =============================================================================

/// Document values of type `datetime`: full date, optional time (`T` or
/// space separated, hours with optional minutes, seconds and fraction),
/// optional `Z` or numeric offset with optional minutes
static ISO8601_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])([T ]([01][0-9]|2[0-3])(:[0-5][0-9](:[0-5][0-9]([.,][0-9]{1,3})?)?)?)?([zZ]|[+-]([01][0-9]|2[0-3])(:?[0-5][0-9])?)?$",
    )
    .unwrap()
});

/// Document values of type `date`
static ISO8601_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$").unwrap()
});

/// Datetime literals in definitions, which may also be truncated to a year or
/// a month
pub(crate) static DATETIME_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]{4})(-(0[1-9]|1[0-2])(-(0[1-9]|[12][0-9]|3[01]))?)?(T([01][0-9]|2[0-3])(:[0-5][0-9])(:[0-5][0-9](\.[0-9]{1,3})?)?(Z|([+-])([01][0-9]|2[0-3]):?([0-5][0-9]))?)?$",
    )
    .unwrap()
});

/// Date literals in definitions
pub(crate) static DATE_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([0-9]{4})-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01]))$").unwrap()
});

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});

/// Capture groups for turning any accepted date/time string into an instant
static DATETIME_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?(?:[T ](\d{2})(?::(\d{2})(?::(\d{2})(?:[.,](\d{1,3}))?)?)?)?([zZ]|[+-]\d{2}(?::?\d{2})?)?$",
    )
    .unwrap()
});

/// Check that a value is a whole number
///
/// Integral floating point values count, since JSON does not distinguish
/// `3` from `3.0`.
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Check that a string is an ISO-8601 date/time
pub fn is_iso8601_datetime(value: &str) -> bool {
    ISO8601_DATETIME.is_match(value)
}

/// Check that a string is an ISO-8601 date without time components
pub fn is_iso8601_date(value: &str) -> bool {
    ISO8601_DATE.is_match(value)
}

/// Check that a string is a hyphenated UUID
pub fn is_uuid(value: &str) -> bool {
    UUID.is_match(value)
}

/// Parse a date/time string into an instant
///
/// Missing components default to the start of the period and a missing
/// offset means UTC. Returns `None` for strings that do not name a real
/// calendar instant (e.g. February 30th).
pub fn parse_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    let caps = DATETIME_PARTS.captures(value)?;
    let number = |idx: usize, default: u32| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2, 1)?, number(3, 1)?)?;
    let millis = match caps.get(7) {
        Some(m) => format!("{:0<3}", m.as_str()).parse().ok()?,
        None => 0,
    };
    let time = NaiveTime::from_hms_milli_opt(number(4, 0)?, number(5, 0)?, number(6, 0)?, millis)?;

    let offset_seconds = match caps.get(8).map(|m| m.as_str()) {
        None | Some("Z") | Some("z") => 0,
        Some(zone) => {
            let sign = if zone.starts_with('-') { -1 } else { 1 };
            let digits: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
            let hours: i32 = digits.get(..2)?.parse().ok()?;
            let minutes: i32 = match digits.get(2..) {
                Some("") | None => 0,
                Some(minutes) => minutes.parse().ok()?,
            };
            sign * (hours * 3600 + minutes * 60)
        }
    };
    let offset = FixedOffset::east_opt(offset_seconds)?;

    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
}

/// Parse a date-only string
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !is_iso8601_date(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

// =============================================================================
// Ordering
// =============================================================================

/// A value reduced to the form its type is ordered by
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    /// Numeric ordering
    Number(f64),
    /// Lexicographic ordering
    Text(String),
    /// Chronological ordering of instants
    Instant(DateTime<FixedOffset>),
    /// Chronological ordering of calendar days
    Day(NaiveDate),
}

impl PartialOrd for Comparable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Text(a), Comparable::Text(b)) => a.partial_cmp(b),
            (Comparable::Instant(a), Comparable::Instant(b)) => a.partial_cmp(b),
            (Comparable::Day(a), Comparable::Day(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Reduce a document value of the given type to its ordering form
pub fn comparable(ty: PropertyType, value: &Value) -> Option<Comparable> {
    match ty {
        PropertyType::Integer | PropertyType::Float => value.as_f64().map(Comparable::Number),
        PropertyType::String => value.as_str().map(|s| Comparable::Text(s.to_string())),
        PropertyType::Uuid => value.as_str().map(|s| Comparable::Text(s.to_lowercase())),
        PropertyType::DateTime => value.as_str().and_then(parse_datetime).map(Comparable::Instant),
        PropertyType::Date => value.as_str().and_then(parse_date).map(Comparable::Day),
        _ => None,
    }
}

/// Reduce a constraint bound to the ordering form of the given type
pub fn comparable_bound(ty: PropertyType, bound: &SchemaValue) -> Option<Comparable> {
    match (ty, bound) {
        (PropertyType::DateTime, SchemaValue::DateTime(dt)) => Some(Comparable::Instant(*dt)),
        (PropertyType::Date, SchemaValue::DateTime(dt)) => Some(Comparable::Day(dt.date_naive())),
        (PropertyType::Date, SchemaValue::String(s)) => {
            parse_date(s).or_else(|| parse_datetime(s).map(|dt| dt.date_naive())).map(Comparable::Day)
        }
        _ => comparable(ty, &bound.to_json()?),
    }
}

// =============================================================================
// Equality
// =============================================================================

/// Equality used by `immutable`, `immutableWhenSet` and `mustEqual`
///
/// A missing value equals `null`, numbers compare by value and date/time
/// strings compare as instants. Arrays and objects compare element-wise under
/// the same rules.
pub fn loosely_equal(ty: Option<PropertyType>, a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => loosely_equal_values(ty, a, b),
        _ => false,
    }
}

fn loosely_equal_values(ty: Option<PropertyType>, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => {
            if x == y {
                return true;
            }
            match ty {
                Some(PropertyType::DateTime) => {
                    matches!((parse_datetime(x), parse_datetime(y)), (Some(p), Some(q)) if p == q)
                }
                Some(PropertyType::Date) => {
                    matches!((parse_date(x), parse_date(y)), (Some(p), Some(q)) if p == q)
                }
                Some(PropertyType::Uuid) => x.eq_ignore_ascii_case(y),
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| loosely_equal(None, Some(x), Some(y)))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.keys()
                .chain(ys.keys())
                .all(|k| loosely_equal(None, xs.get(k), ys.get(k)))
        }
        _ => a == b,
    }
}

/// Equality used by the `*Strict` constraint variants
///
/// A missing value differs from `null`; values must have the same JSON type
/// and the same content. Numbers compare by value.
pub fn strictly_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => strictly_equal_values(a, b),
        _ => false,
    }
}

fn strictly_equal_values(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| strictly_equal_values(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| strictly_equal_values(x, y)))
        }
        _ => a == b,
    }
}
