//! Tagged field values and the schema-aware decoding step.
//!
//! Mod content arrives as JSON. Before it reaches a record table every field is
//! decoded into a [`Value`] according to the [`FieldKind`] the table schema
//! declares for it. The kind of a patchable field is fixed by the first
//! character of its name:
//!
//! | prefix | kind |
//! |---|---|
//! | `n`, `#` | [`FieldKind::Int`] |
//! | `f` | [`FieldKind::Float`] |
//! | `s`, `w` | [`FieldKind::Str`] |
//!
//! Any other prefix marks a field that cannot be patched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type a record field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Int,
    Float,
    Str,
}

impl FieldKind {
    /// Kind implied by a field's name prefix, or `None` if the field is not patchable.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name.chars().next()? {
            'n' | '#' => Some(FieldKind::Int),
            'f' => Some(FieldKind::Float),
            's' | 'w' => Some(FieldKind::Str),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Int => f.write_str("int"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Str => f.write_str("string"),
        }
    }
}

/// A decoded record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Int(_) => FieldKind::Int,
            Value::Float(_) => FieldKind::Float,
            Value::Str(_) => FieldKind::Str,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Decode a JSON value as `kind`.
    ///
    /// - Integers outside `i32` but inside `u32` are reinterpreted as signed
    ///   (`0xFFFF_FFFF` becomes `-1`). Game tables store hashes and flag masks
    ///   this way.
    /// - Integral floats are not accepted for int fields.
    /// - Any JSON number is accepted for float fields.
    /// - `null` in a string field decodes to the literal string `"null"`, which is
    ///   what the game's own tables use for an empty reference.
    pub fn decode(kind: FieldKind, json: &serde_json::Value) -> Result<Self, String> {
        match kind {
            FieldKind::Int => decode_int(json).map(Value::Int),
            FieldKind::Float => json
                .as_f64()
                .map(|v| Value::Float(v as f32))
                .ok_or_else(|| format!("expected a number, found {json}")),
            FieldKind::Str => match json {
                serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
                serde_json::Value::Null => Ok(Value::Str("null".to_string())),
                other => Err(format!("expected a string, found {other}")),
            },
        }
    }
}

fn decode_int(json: &serde_json::Value) -> Result<i32, String> {
    if let Some(v) = json.as_i64() {
        if let Ok(v) = i32::try_from(v) {
            return Ok(v);
        }
        if let Ok(v) = u32::try_from(v) {
            return Ok(v as i32);
        }
        return Err(format!("{v} does not fit in 32 bits"));
    }
    if json.is_u64() {
        return Err(format!("{json} does not fit in 32 bits"));
    }
    Err(format!("expected an integer, found {json}"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_prefix() {
        assert_eq!(FieldKind::from_field_name("n_ID"), Some(FieldKind::Int));
        assert_eq!(FieldKind::from_field_name("#_HASH"), Some(FieldKind::Int));
        assert_eq!(FieldKind::from_field_name("f_SPEED"), Some(FieldKind::Float));
        assert_eq!(FieldKind::from_field_name("s_NAME"), Some(FieldKind::Str));
        assert_eq!(FieldKind::from_field_name("w_KEY"), Some(FieldKind::Str));
        assert_eq!(FieldKind::from_field_name("Pointer"), None);
        assert_eq!(FieldKind::from_field_name(""), None);
    }

    #[test]
    fn test_decode_int_signed_reinterpretation() {
        assert_eq!(Value::decode(FieldKind::Int, &json!(42)), Ok(Value::Int(42)));
        assert_eq!(Value::decode(FieldKind::Int, &json!(-7)), Ok(Value::Int(-7)));
        assert_eq!(
            Value::decode(FieldKind::Int, &json!(4294967295u64)),
            Ok(Value::Int(-1))
        );
        assert_eq!(
            Value::decode(FieldKind::Int, &json!(2147483648u64)),
            Ok(Value::Int(i32::MIN))
        );
        assert!(Value::decode(FieldKind::Int, &json!(4294967296u64)).is_err());
        assert!(Value::decode(FieldKind::Int, &json!(u64::MAX)).is_err());
        assert!(Value::decode(FieldKind::Int, &json!(1.5)).is_err());
        assert!(Value::decode(FieldKind::Int, &json!("12")).is_err());
    }

    #[test]
    fn test_decode_float_and_str() {
        assert_eq!(
            Value::decode(FieldKind::Float, &json!(2)),
            Ok(Value::Float(2.0))
        );
        assert_eq!(
            Value::decode(FieldKind::Str, &json!("abc")),
            Ok(Value::Str("abc".to_string()))
        );
        assert_eq!(
            Value::decode(FieldKind::Str, &json!(null)),
            Ok(Value::Str("null".to_string()))
        );
        assert!(Value::decode(FieldKind::Str, &json!(3)).is_err());
    }
}
