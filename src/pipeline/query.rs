//! Query filters
//!
//! A filter is built from every candidate parameter of a read; empty
//! entries are dropped before the query string is serialized.

use serde_json::Value;
use std::collections::BTreeMap;

/// Candidate query parameters for a list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    params: BTreeMap<String, Value>,
}

/// True when a value carries nothing worth sending
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate parameter. `None` and empty values are dropped.
    pub fn with(mut self, key: &str, value: impl Into<Option<Value>>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Option<Value>>) {
        match value.into() {
            Some(v) if !is_empty_value(&v) => {
                self.params.insert(key.to_string(), v);
            }
            _ => {
                self.params.remove(key);
            }
        }
    }

    /// Build a filter from an arbitrary map, removing empty entries
    pub fn remove_nil<I, K>(candidates: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut filter = Self::new();
        for (key, value) in candidates {
            filter.insert(key.as_ref(), value);
        }
        filter
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Serialize to query pairs. Strings are sent verbatim, arrays repeat the key.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            match value {
                Value::Array(items) => {
                    for item in items.iter().filter(|v| !is_empty_value(v)) {
                        pairs.push((key.clone(), scalar_text(item)));
                    }
                }
                other => pairs.push((key.clone(), scalar_text(other))),
            }
        }
        pairs
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Optional string attribute as a filter value
pub fn opt_str(value: Option<&str>) -> Option<Value> {
    value.map(|s| Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_entries_are_omitted() {
        let filter = QueryFilter::remove_nil([
            ("type", json!("")),
            ("vpc_id", json!("v1")),
            ("destination", json!("")),
        ]);
        assert_eq!(filter.to_pairs(), vec![("vpc_id".to_string(), "v1".to_string())]);
    }

    #[test]
    fn test_zero_and_false_are_kept() {
        let filter = QueryFilter::new()
            .with("limit", json!(0))
            .with("enabled", json!(false))
            .with("name", None::<Value>);
        let pairs = filter.to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("enabled".to_string(), "false".to_string()),
                ("limit".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_array_values_repeat_key() {
        let filter = QueryFilter::new().with("id", json!(["a", "", "b"]));
        assert_eq!(
            filter.to_pairs(),
            vec![
                ("id".to_string(), "a".to_string()),
                ("id".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_empty_clears_previous_value() {
        let mut filter = QueryFilter::new().with("vpc_id", json!("v1"));
        filter.insert("vpc_id", json!(""));
        assert!(filter.is_empty());
    }
}
