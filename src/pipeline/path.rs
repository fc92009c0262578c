//! Dot-notation JSON paths
//!
//! `routes.0.id` walks objects by key and arrays by index; `-1` selects
//! the last element of an array.

use serde_json::Value;

/// Look up a value by dot-notation path. An empty path returns the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Array(items) => {
                let idx: i64 = part.parse().ok()?;
                let idx = if idx < 0 {
                    items.len().checked_sub(idx.unsigned_abs() as usize)?
                } else {
                    idx as usize
                };
                items.get(idx)?
            }
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Name of a JSON value's type, for error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
