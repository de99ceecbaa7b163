//! Small value predicates shared by rules and conditions.

use serde_json::Value;

/// A borrowable null for "field absent from the snapshot".
pub(crate) static NULL: Value = Value::Null;

/// Whether a value counts as present: non-null, non-blank, non-empty.
pub(crate) fn present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// The magnitude a threshold rule compares against: character count for
/// text, element count for lists, the number itself for numbers. `None`
/// for shapes a threshold cannot apply to (the check is then vacuous).
pub(crate) fn magnitude(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
