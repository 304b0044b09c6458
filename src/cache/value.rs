//! Cache Value Module
//!
//! The value model stored in the local tiers and the wire encoding used for
//! the remote tier.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Value ==
/// A cached value: either a scalar or a structured JSON document.
///
/// Serde treats this as plain JSON, so it converts to and from any
/// serializable type through [`serde_json::Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Structured(Value),
}

impl CacheValue {
    /// Returns true for the scalar variants.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, CacheValue::Structured(_))
    }

    /// Converts the value into a JSON document.
    pub fn to_json(&self) -> Value {
        match self {
            CacheValue::Text(s) => Value::String(s.clone()),
            CacheValue::Integer(i) => Value::from(*i),
            CacheValue::Float(f) => Value::from(*f),
            CacheValue::Bool(b) => Value::Bool(*b),
            CacheValue::Structured(v) => v.clone(),
        }
    }

    /// Maps a JSON document onto the closest variant.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => CacheValue::Text(s),
            Value::Bool(b) => CacheValue::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => CacheValue::Integer(i),
                (None, Some(f)) if n.is_f64() => CacheValue::Float(f),
                _ => CacheValue::Structured(Value::Number(n)),
            },
            other => CacheValue::Structured(other),
        }
    }

    /// Approximate in-memory footprint, measured as the display length.
    pub fn approx_size(&self) -> usize {
        match self {
            CacheValue::Text(s) => s.len(),
            other => other.to_string().len(),
        }
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Text(s) => f.write_str(s),
            CacheValue::Integer(i) => write!(f, "{}", i),
            CacheValue::Float(v) => write!(f, "{}", v),
            CacheValue::Bool(b) => write!(f, "{}", b),
            CacheValue::Structured(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Integer(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Integer(value.into())
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Float(value)
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        CacheValue::Structured(value)
    }
}

// == Serializer ==
/// Encodes a value for the remote tier.
///
/// Scalars become their string form, structured values become compact JSON.
/// Floats always keep a fractional part so they decode as floats again.
pub fn serialize(value: &CacheValue) -> Vec<u8> {
    match value {
        CacheValue::Structured(v) => v.to_string().into_bytes(),
        CacheValue::Float(f) => format!("{:?}", f).into_bytes(),
        scalar => scalar.to_string().into_bytes(),
    }
}

/// Decodes bytes read from the remote tier.
///
/// JSON is tried first; text that is not JSON comes back as [`CacheValue::Text`].
/// Only bytes that are not valid UTF-8 fail.
pub fn deserialize(bytes: &[u8]) -> Result<CacheValue> {
    let text = std::str::from_utf8(bytes).map_err(|e| CacheError::Decode(e.to_string()))?;

    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(CacheValue::from_json(value)),
        Err(_) => Ok(CacheValue::Text(text.to_string())),
    }
}
