//! Flatten API records into output rows
//!
//! Each resource kind declares a static table of [`FieldRule`]s mapping a
//! record path to an output attribute. Missing fields become the zero
//! value of the declared kind; fields of the wrong type are collected
//! and reported together.

use super::path::{lookup, type_name};
use crate::error::{Error, FieldError, Result};
use serde_json::{Map, Value};

/// One flattened output row
pub type Row = Map<String, Value>;

/// Declared type of an output attribute
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Integer,
    Bool,
    StringList,
    /// Array of objects reduced to one string field of each, e.g. `[{"subnet_id": "a"}]`
    Pluck(&'static str),
    /// Nested object, emitted as a list of at most one row
    Block(&'static [FieldRule]),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Bool => "bool",
            FieldKind::StringList => "list of strings",
            FieldKind::Pluck(_) => "list of objects",
            FieldKind::Block(_) => "object",
        }
    }

    fn zero(&self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Integer => Value::from(0),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::StringList | FieldKind::Pluck(_) | FieldKind::Block(_) => {
                Value::Array(Vec::new())
            }
        }
    }
}

/// Extraction rule: record path to output attribute
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub attribute: &'static str,
    pub path: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn new(attribute: &'static str, path: &'static str, kind: FieldKind) -> Self {
        Self {
            attribute,
            path,
            kind,
        }
    }

    pub const fn string(attribute: &'static str, path: &'static str) -> Self {
        Self::new(attribute, path, FieldKind::String)
    }

    pub const fn integer(attribute: &'static str, path: &'static str) -> Self {
        Self::new(attribute, path, FieldKind::Integer)
    }

    pub const fn bool(attribute: &'static str, path: &'static str) -> Self {
        Self::new(attribute, path, FieldKind::Bool)
    }

    pub const fn string_list(attribute: &'static str, path: &'static str) -> Self {
        Self::new(attribute, path, FieldKind::StringList)
    }

    pub const fn pluck(attribute: &'static str, path: &'static str, key: &'static str) -> Self {
        Self::new(attribute, path, FieldKind::Pluck(key))
    }

    pub const fn block(
        attribute: &'static str,
        path: &'static str,
        fields: &'static [FieldRule],
    ) -> Self {
        Self::new(attribute, path, FieldKind::Block(fields))
    }
}

/// Outcome of extracting one field
enum Extracted {
    Present(Value),
    Absent,
    Invalid(&'static str),
}

fn extract(
    kind: &FieldKind,
    value: Option<&Value>,
    record: usize,
    errors: &mut Vec<FieldError>,
    prefix: &str,
) -> Extracted {
    let value = match value {
        None | Some(Value::Null) => return Extracted::Absent,
        Some(v) => v,
    };

    match (kind, value) {
        (FieldKind::String, Value::String(_)) => Extracted::Present(value.clone()),
        (FieldKind::String, Value::Number(n)) => Extracted::Present(Value::String(n.to_string())),
        (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Extracted::Present(value.clone())
        }
        (FieldKind::Integer, Value::String(s)) => match s.parse::<i64>() {
            Ok(n) => Extracted::Present(Value::from(n)),
            Err(_) => Extracted::Invalid("string"),
        },
        (FieldKind::Bool, Value::Bool(_)) => Extracted::Present(value.clone()),
        (FieldKind::StringList, Value::Array(items)) => {
            if items.iter().all(Value::is_string) {
                Extracted::Present(value.clone())
            } else {
                Extracted::Invalid("array with non-string items")
            }
        }
        (FieldKind::Pluck(inner), Value::Array(items)) => {
            let plucked: Option<Vec<Value>> = items
                .iter()
                .map(|item| lookup(item, inner).filter(|v| v.is_string()).cloned())
                .collect();
            match plucked {
                Some(values) => Extracted::Present(Value::Array(values)),
                None => Extracted::Invalid("array with items missing the key"),
            }
        }
        (FieldKind::Block(fields), Value::Object(_)) => {
            let row = map_fields(fields, value, record, errors, prefix);
            Extracted::Present(Value::Array(vec![Value::Object(row)]))
        }
        (_, other) => Extracted::Invalid(type_name(other)),
    }
}

fn map_fields(
    fields: &[FieldRule],
    record: &Value,
    index: usize,
    errors: &mut Vec<FieldError>,
    prefix: &str,
) -> Row {
    let mut row = Row::new();
    for field in fields {
        let attribute = if prefix.is_empty() {
            field.attribute.to_string()
        } else {
            format!("{}.0.{}", prefix, field.attribute)
        };
        let value = match extract(&field.kind, lookup(record, field.path), index, errors, &attribute) {
            Extracted::Present(v) => v,
            Extracted::Absent => field.kind.zero(),
            Extracted::Invalid(found) => {
                errors.push(FieldError {
                    record: index,
                    attribute,
                    expected: field.kind.name(),
                    found: found.to_string(),
                });
                field.kind.zero()
            }
        };
        row.insert(field.attribute.to_string(), value);
    }
    row
}

/// Maps records of one resource kind to rows
#[derive(Debug, Clone, Copy)]
pub struct RowMapper {
    fields: &'static [FieldRule],
}

impl RowMapper {
    pub const fn new(fields: &'static [FieldRule]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [FieldRule] {
        self.fields
    }

    /// Map a single record
    pub fn map_record(&self, record: &Value) -> Result<Row> {
        let mut errors = Vec::new();
        let row = map_fields(self.fields, record, 0, &mut errors, "");
        if errors.is_empty() {
            Ok(row)
        } else {
            Err(Error::Fields(errors))
        }
    }

    /// Map every record of a JSON array, keeping response order
    pub fn map_all(&self, records: &Value) -> Result<Vec<Row>> {
        let Some(records) = records.as_array() else {
            return Err(Error::parse(
                "record list",
                format!("expected array, found {}", type_name(records)),
            ));
        };

        let mut errors = Vec::new();
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, record)| map_fields(self.fields, record, i, &mut errors, ""))
            .collect();

        if errors.is_empty() {
            Ok(rows)
        } else {
            Err(Error::Fields(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GROUP: &[FieldRule] = &[FieldRule::string("id", "id"), FieldRule::string("name", "name")];

    const FIELDS: &[FieldRule] = &[
        FieldRule::string("id", "id"),
        FieldRule::integer("port", "access.port"),
        FieldRule::bool("enabled", "enabled"),
        FieldRule::string_list("network_ids", "subnet_ids"),
        FieldRule::block("security_group", "infrastructure_security_group", GROUP),
        FieldRule::pluck("subnets", "subnets", "subnet_id"),
    ];

    const MAPPER: RowMapper = RowMapper::new(FIELDS);

    #[test]
    fn test_missing_fields_get_zero_values() {
        let row = MAPPER.map_record(&json!({"id": "r1", "extra": true})).unwrap();
        assert_eq!(row["id"], "r1");
        assert_eq!(row["port"], 0);
        assert_eq!(row["enabled"], false);
        assert_eq!(row["network_ids"], json!([]));
        assert_eq!(row["security_group"], json!([]));
        assert!(!row.contains_key("extra"));
    }

    #[test]
    fn test_nested_block_and_numeric_string() {
        let row = MAPPER
            .map_record(&json!({
                "id": "r1",
                "access": {"port": "9001"},
                "subnet_ids": ["master", "standby"],
                "infrastructure_security_group": {"id": "sg-1", "name": "infra"}
            }))
            .unwrap();
        assert_eq!(row["port"], 9001);
        assert_eq!(row["network_ids"], json!(["master", "standby"]));
        assert_eq!(row["security_group"], json!([{"id": "sg-1", "name": "infra"}]));
        assert_eq!(row["subnets"], json!([]));
    }

    #[test]
    fn test_pluck_list() {
        let row = MAPPER
            .map_record(&json!({"subnets": [{"subnet_id": "a"}, {"subnet_id": "b"}]}))
            .unwrap();
        assert_eq!(row["subnets"], json!(["a", "b"]));

        let err = MAPPER
            .map_record(&json!({"subnets": [{"subnet_id": "a"}, {"id": "b"}]}))
            .unwrap_err();
        assert!(matches!(err, Error::Fields(ref e) if e[0].attribute == "subnets"));
    }

    #[test]
    fn test_all_field_errors_are_reported() {
        let err = MAPPER
            .map_all(&json!([
                {"id": "ok"},
                {"id": {"nested": 1}, "enabled": "yes"},
                {"infrastructure_security_group": {"id": true}, "subnet_ids": [1]}
            ]))
            .unwrap_err();

        let Error::Fields(errors) = err else {
            panic!("expected field errors");
        };
        let attributes: Vec<_> = errors.iter().map(|e| (e.record, e.attribute.as_str())).collect();
        assert_eq!(
            attributes,
            vec![
                (1, "id"),
                (1, "enabled"),
                (2, "network_ids"),
                (2, "security_group.0.id"),
            ]
        );
    }

    #[test]
    fn test_map_all_keeps_order() {
        let rows = MAPPER
            .map_all(&json!([{"id": "b"}, {"id": "a"}, {"id": "c"}]))
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn test_map_all_rejects_non_array() {
        assert!(matches!(
            MAPPER.map_all(&json!({"id": "x"})),
            Err(Error::Parse { .. })
        ));
    }
}
