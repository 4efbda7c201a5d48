//! Universal Value type that flows between value nodes, properties, and
//! game messages
//!
//! Every property slot and every value link in a script carries one of these.
//! Values also have a stable formatted string form used for display and for
//! property-equality searches.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Value Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Discriminant of a [`Value`], used for value-link type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Double,
    String,
    Id,
    Array,
}

impl ValueKind {
    /// Whether a value of this kind may connect to a link expecting `other`.
    ///
    /// Int and Double are mutually convertible; Null connects anywhere.
    pub fn is_compatible_with(self, other: ValueKind) -> bool {
        if self == other || self == ValueKind::Null || other == ValueKind::Null {
            return true;
        }
        matches!(
            (self, other),
            (ValueKind::Int, ValueKind::Double) | (ValueKind::Double, ValueKind::Int)
        )
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Id => "id",
            ValueKind::Array => "array",
        };
        write!(f, "{name}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Universal Value Type
// ─────────────────────────────────────────────────────────────────────────────

/// Universal value type for the Director scripting system
///
/// This enum represents all values a script can hold:
/// - Primitive types (null, bool, int, double, string)
/// - Stable ids referencing actors or other external objects
/// - Ordered arrays of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    /// Null/unset value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Stable id of an external object (actor, handle)
    Id(uuid::Uuid),
    /// Ordered array of values
    Array(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Accessors
// ─────────────────────────────────────────────────────────────────────────────

impl Value {
    /// The kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Id(_) => ValueKind::Id,
            Value::Array(_) => ValueKind::Array,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 (also converts from double if lossless)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Double(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Get as f64 (also converts from int)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as id
    pub fn as_id(&self) -> Option<uuid::Uuid> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as array reference
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get as mutable array reference
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get an element from an array
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|arr| arr.get(index))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatted Form
// ─────────────────────────────────────────────────────────────────────────────

/// Error when parsing a formatted value string
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot parse {text:?} as {kind}")]
pub struct ValueParseError {
    pub kind: ValueKind,
    pub text: String,
}

impl std::fmt::Display for Value {
    /// The formatted string form: round-trippable through
    /// [`Value::parse_formatted`] for every kind except Null
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Id(id) => write!(f, "{id}"),
            Value::Array(_) => {
                let json: serde_json::Value = self.clone().into();
                write!(f, "{json}")
            }
        }
    }
}

impl Value {
    /// Parse the formatted string form back into a value of the given kind
    pub fn parse_formatted(kind: ValueKind, text: &str) -> Result<Value, ValueParseError> {
        let fail = || ValueParseError {
            kind,
            text: text.to_string(),
        };
        match kind {
            ValueKind::Null => Ok(Value::Null),
            ValueKind::Bool => match text.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            ValueKind::Int => text.trim().parse().map(Value::Int).map_err(|_| fail()),
            ValueKind::Double => text.trim().parse().map(Value::Double).map_err(|_| fail()),
            ValueKind::String => Ok(Value::String(text.to_string())),
            ValueKind::Id => uuid::Uuid::parse_str(text.trim())
                .map(Value::Id)
                .map_err(|_| fail()),
            ValueKind::Array => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .map_err(|_| fail()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Id(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// serde_json::Value Interop
// ─────────────────────────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Double(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(_) => Value::Null,
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Double(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Id(id) => serde_json::Value::String(id.to_string()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
