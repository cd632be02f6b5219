//! Schema values
//!
//! Document definitions are authored as trees of [`SchemaValue`]s. A schema
//! value is a superset of JSON: besides the usual scalars, arrays and objects
//! it can hold compiled regular expressions, date/time literals and
//! callables ([`SchemaFn`]) that compute a constraint from the document being
//! validated.
//!
//! The [`schema!`](crate::schema) macro builds object and array trees:
//!
//! ```
//! use syncschema::schema;
//! use syncschema::values::SchemaFn;
//!
//! let validator = schema!({
//!     "type": "string",
//!     "required": true,
//!     "maximumLength": (SchemaFn::binary(|doc, _| doc["limit"].clone().into()))
//! });
//! assert!(validator.get("required").is_some());
//! ```

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

use crate::validators::validation::ItemFrame;

/// Ordered map used for schema objects
pub type SchemaMap = IndexMap<String, SchemaValue>;

/// Signature shared by every callable stored in a definition
pub type SchemaCallback = dyn Fn(&CallContext<'_>) -> SchemaValue + Send + Sync;

// =============================================================================
// Call context
// =============================================================================

/// Everything a callable may look at when it is invoked
///
/// Which fields are populated depends on where the callable sits: definition
/// level callables only see the document pair, property level ones also see
/// the current item.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// The document being written
    pub doc: &'a Value,
    /// The previous revision, if any
    pub old_doc: Option<&'a Value>,
    /// Current value of the item being validated
    pub value: Option<&'a Value>,
    /// Previous value of the item being validated
    pub old_value: Option<&'a Value>,
    /// Candidate document type (type filters only)
    pub doc_type: Option<&'a str>,
    /// Traversal frame of the item being validated
    pub frame: Option<&'a ItemFrame<'a>>,
}

impl<'a> CallContext<'a> {
    /// Context for definition-level callables
    pub fn document(doc: &'a Value, old_doc: Option<&'a Value>) -> Self {
        Self {
            doc,
            old_doc,
            value: None,
            old_value: None,
            doc_type: None,
            frame: None,
        }
    }

    /// Add the current item's values
    pub fn with_item(mut self, value: Option<&'a Value>, old_value: Option<&'a Value>) -> Self {
        self.value = value;
        self.old_value = old_value;
        self
    }

    /// Add the traversal frame (also sets the item values from it)
    pub fn with_frame(mut self, frame: &'a ItemFrame<'a>) -> Self {
        self.value = frame.value;
        self.old_value = frame.old_value;
        self.frame = Some(frame);
        self
    }

    /// Add the candidate document type
    pub fn with_doc_type(mut self, doc_type: &'a str) -> Self {
        self.doc_type = Some(doc_type);
        self
    }
}

// =============================================================================
// Callables
// =============================================================================

/// A bounded-arity callable stored in a definition
///
/// The arity is declared when the callable is built and is checked against
/// the position the callable occupies (see
/// [`ConstraintScope`](crate::constraints::ConstraintScope)).
#[derive(Clone)]
pub struct SchemaFn {
    arity: usize,
    callback: Arc<SchemaCallback>,
}

impl SchemaFn {
    /// Create a callable with an explicit arity
    pub fn new<F>(arity: usize, callback: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> SchemaValue + Send + Sync + 'static,
    {
        Self {
            arity,
            callback: Arc::new(callback),
        }
    }

    /// A factory taking no parameters
    pub fn nullary<F>(callback: F) -> Self
    where
        F: Fn() -> SchemaValue + Send + Sync + 'static,
    {
        Self::new(0, move |_| callback())
    }

    /// A callable over the document only
    pub fn unary<F>(callback: F) -> Self
    where
        F: Fn(&Value) -> SchemaValue + Send + Sync + 'static,
    {
        Self::new(1, move |ctx| callback(ctx.doc))
    }

    /// A callable over the document and its previous revision
    pub fn binary<F>(callback: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> SchemaValue + Send + Sync + 'static,
    {
        Self::new(2, move |ctx| callback(ctx.doc, ctx.old_doc))
    }

    /// A type filter over the document, its previous revision and the
    /// candidate type name
    pub fn type_filter<F>(callback: F) -> Self
    where
        F: Fn(&Value, Option<&Value>, &str) -> bool + Send + Sync + 'static,
    {
        Self::new(3, move |ctx| {
            SchemaValue::Bool(callback(ctx.doc, ctx.old_doc, ctx.doc_type.unwrap_or_default()))
        })
    }

    /// A property-level callable over the document pair and the item pair
    pub fn item<F>(callback: F) -> Self
    where
        F: Fn(&Value, Option<&Value>, Option<&Value>, Option<&Value>) -> SchemaValue
            + Send
            + Sync
            + 'static,
    {
        Self::new(4, move |ctx| callback(ctx.doc, ctx.old_doc, ctx.value, ctx.old_value))
    }

    /// Declared number of parameters
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke the callable
    pub fn call(&self, ctx: &CallContext<'_>) -> SchemaValue {
        (self.callback)(ctx)
    }
}

impl fmt::Debug for SchemaFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaFn(arity = {})", self.arity)
    }
}

// =============================================================================
// Schema values
// =============================================================================

/// A node of a document definition tree
#[derive(Debug, Clone)]
pub enum SchemaValue {
    /// JSON null
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number
    Number(Number),
    /// JSON string
    String(String),
    /// Ordered list of values
    Array(Vec<SchemaValue>),
    /// Ordered map of values
    Object(SchemaMap),
    /// Compiled regular expression
    Regex(Regex),
    /// Date/time literal
    DateTime(DateTime<FixedOffset>),
    /// Callable evaluated against the document being validated
    Function(SchemaFn),
}

impl SchemaValue {
    /// Build an object from key/value pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SchemaValue)>,
    {
        SchemaValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Human readable name of the value's kind
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaValue::Null => "null",
            SchemaValue::Bool(_) => "boolean",
            SchemaValue::Number(_) => "number",
            SchemaValue::String(_) => "string",
            SchemaValue::Array(_) => "array",
            SchemaValue::Object(_) => "object",
            SchemaValue::Regex(_) => "regular expression",
            SchemaValue::DateTime(_) => "date",
            SchemaValue::Function(_) => "function",
        }
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, SchemaValue::Null)
    }

    /// Whether this is a callable
    pub fn is_function(&self) -> bool {
        matches!(self, SchemaValue::Function(_))
    }

    /// Boolean value, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SchemaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String slice, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SchemaValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SchemaValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Integer value, if this is a number with no fractional part
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SchemaValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }

    /// Elements, if this is an array
    pub fn as_array(&self) -> Option<&[SchemaValue]> {
        match self {
            SchemaValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Entries, if this is an object
    pub fn as_object(&self) -> Option<&SchemaMap> {
        match self {
            SchemaValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Compiled pattern, if this is a regular expression
    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            SchemaValue::Regex(re) => Some(re),
            _ => None,
        }
    }

    /// Callable, if this is a function
    pub fn as_function(&self) -> Option<&SchemaFn> {
        match self {
            SchemaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a key of an object
    pub fn get(&self, key: &str) -> Option<&SchemaValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Convert to plain JSON
    ///
    /// Returns `None` when the tree contains a regular expression or a
    /// callable. Date/time literals become RFC 3339 strings.
    pub fn to_json(&self) -> Option<Value> {
        Some(match self {
            SchemaValue::Null => Value::Null,
            SchemaValue::Bool(b) => Value::Bool(*b),
            SchemaValue::Number(n) => Value::Number(n.clone()),
            SchemaValue::String(s) => Value::String(s.clone()),
            SchemaValue::Array(items) => Value::Array(
                items.iter().map(SchemaValue::to_json).collect::<Option<Vec<_>>>()?,
            ),
            SchemaValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
            SchemaValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            SchemaValue::Regex(_) | SchemaValue::Function(_) => return None,
        })
    }
}

impl fmt::Display for SchemaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaValue::String(s) => write!(f, "{}", s),
            SchemaValue::Regex(re) => write!(f, "/{}/", re.as_str()),
            SchemaValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            SchemaValue::Function(func) => write!(f, "{:?}", func),
            SchemaValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            other => match other.to_json() {
                Some(json) => write!(f, "{}", json),
                None => write!(f, "[{}]", other.kind()),
            },
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Value> for SchemaValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SchemaValue::Null,
            Value::Bool(b) => SchemaValue::Bool(b),
            Value::Number(n) => SchemaValue::Number(n),
            Value::String(s) => SchemaValue::String(s),
            Value::Array(items) => {
                SchemaValue::Array(items.into_iter().map(SchemaValue::from).collect())
            }
            Value::Object(map) => {
                SchemaValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&Value> for SchemaValue {
    fn from(value: &Value) -> Self {
        value.clone().into()
    }
}

impl From<bool> for SchemaValue {
    fn from(b: bool) -> Self {
        SchemaValue::Bool(b)
    }
}

impl From<&str> for SchemaValue {
    fn from(s: &str) -> Self {
        SchemaValue::String(s.to_string())
    }
}

impl From<String> for SchemaValue {
    fn from(s: String) -> Self {
        SchemaValue::String(s)
    }
}

impl From<i32> for SchemaValue {
    fn from(n: i32) -> Self {
        SchemaValue::Number(n.into())
    }
}

impl From<i64> for SchemaValue {
    fn from(n: i64) -> Self {
        SchemaValue::Number(n.into())
    }
}

impl From<u64> for SchemaValue {
    fn from(n: u64) -> Self {
        SchemaValue::Number(n.into())
    }
}

impl From<f64> for SchemaValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n)
            .map(SchemaValue::Number)
            .unwrap_or(SchemaValue::Null)
    }
}

impl From<Regex> for SchemaValue {
    fn from(re: Regex) -> Self {
        SchemaValue::Regex(re)
    }
}

impl From<DateTime<FixedOffset>> for SchemaValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        SchemaValue::DateTime(dt)
    }
}

impl From<SchemaFn> for SchemaValue {
    fn from(f: SchemaFn) -> Self {
        SchemaValue::Function(f)
    }
}

impl From<SchemaMap> for SchemaValue {
    fn from(map: SchemaMap) -> Self {
        SchemaValue::Object(map)
    }
}

impl<T: Into<SchemaValue>> From<Vec<T>> for SchemaValue {
    fn from(items: Vec<T>) -> Self {
        SchemaValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SchemaValue>> From<Option<T>> for SchemaValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SchemaValue::Null)
    }
}

/// Build a [`SchemaValue`] tree
///
/// Objects and arrays nest with `{ ... }` and `[ ... ]`; every other value is
/// converted with `SchemaValue::from`. Values made of more than one token
/// (calls, negative numbers, closures) must be wrapped in parentheses.
///
/// ```
/// use syncschema::schema;
/// use regex::Regex;
///
/// let validators = schema!({
///     "code": { "type": "string", "regexPattern": (Regex::new("^[A-Z]+$").unwrap()) },
///     "tags": { "type": "array", "arrayElementsValidator": { "type": "string" } },
///     "offset": { "type": "integer", "minimumValue": (-10) }
/// });
/// assert_eq!(validators.as_object().unwrap().len(), 3);
/// ```
#[macro_export]
macro_rules! schema {
    (null) => {
        $crate::values::SchemaValue::Null
    };
    ({}) => {
        $crate::values::SchemaValue::Object($crate::values::SchemaMap::new())
    };
    ({ $($key:literal : $value:tt),* $(,)? }) => {
        $crate::values::SchemaValue::object([
            $(($key, $crate::schema!($value))),*
        ])
    };
    ([ $($element:tt),* $(,)? ]) => {
        $crate::values::SchemaValue::Array(vec![$($crate::schema!($element)),*])
    };
    ($other:expr) => {
        $crate::values::SchemaValue::from($other)
    };
}
