//! Tracked resource state
//!
//! Attributes are kept flat, the way plan/apply tooling stores them:
//! lists become `key.#` plus `key.0`, `key.1`, ...; nested blocks become
//! `key.0.field`. Only lists carry a count.

use crate::pipeline::Row;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type Attributes = BTreeMap<String, String>;

/// State of one tracked resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceState {
    pub id: String,
    pub attributes: Attributes,
}

impl ResourceState {
    /// Build from a flattened row. The ID comes from the row's `id` attribute.
    pub fn from_row(row: &Row) -> Self {
        let attributes = flatten_attributes(row);
        Self {
            id: attributes.get("id").cloned().unwrap_or_default(),
            attributes,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// All resources tracked by a test, keyed by address (`hcso_vpc_subnet.master`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestState {
    resources: BTreeMap<String, ResourceState>,
}

impl TestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: &str, state: ResourceState) {
        self.resources.insert(address.to_string(), state);
    }

    pub fn with(mut self, address: &str, state: ResourceState) -> Self {
        self.insert(address, state);
        self
    }

    pub fn resource(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Attribute of a resource; `id` resolves to the resource ID
    pub fn attribute(&self, address: &str, key: &str) -> Option<&str> {
        let resource = self.resource(address)?;
        match key {
            "id" => Some(resource.id.as_str()),
            _ => resource.get(key),
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Attributes) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Array(items) => {
            out.insert(format!("{}.#", prefix), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                flatten_into(&format!("{}.{}", prefix, i), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(&format!("{}.{}", prefix, key), item, out);
            }
        }
    }
}

/// Flatten a row into dotted attribute keys
pub fn flatten_attributes(row: &Row) -> Attributes {
    let mut out = Attributes::new();
    for (key, value) in row {
        flatten_into(key, value, &mut out);
    }
    out
}

/// One attribute difference between two states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDiff {
    Added { key: String, value: String },
    Removed { key: String, old: String },
    Changed { key: String, old: String, new: String },
}

impl AttributeDiff {
    pub fn key(&self) -> &str {
        match self {
            AttributeDiff::Added { key, .. }
            | AttributeDiff::Removed { key, .. }
            | AttributeDiff::Changed { key, .. } => key,
        }
    }
}

impl fmt::Display for AttributeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDiff::Added { key, value } => write!(f, "+ {} = {:?}", key, value),
            AttributeDiff::Removed { key, old } => write!(f, "- {} = {:?}", key, old),
            AttributeDiff::Changed { key, old, new } => write!(f, "~ {}: {:?} -> {:?}", key, old, new),
        }
    }
}

/// Attribute-level diff, `old` to `new`
pub fn diff_attributes(old: &Attributes, new: &Attributes) -> Vec<AttributeDiff> {
    let mut diffs = Vec::new();
    for (key, old_value) in old {
        match new.get(key) {
            None => diffs.push(AttributeDiff::Removed {
                key: key.clone(),
                old: old_value.clone(),
            }),
            Some(new_value) if new_value != old_value => diffs.push(AttributeDiff::Changed {
                key: key.clone(),
                old: old_value.clone(),
                new: new_value.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, value) in new {
        if !old.contains_key(key) {
            diffs.push(AttributeDiff::Added {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }
    diffs
}

/// Diff of every resource in two states; keys are prefixed with the address
pub fn diff_states(old: &TestState, new: &TestState) -> Vec<AttributeDiff> {
    let empty = ResourceState::default();
    let mut addresses: Vec<&str> = old.addresses().chain(new.addresses()).collect();
    addresses.sort_unstable();
    addresses.dedup();

    let mut diffs = Vec::new();
    for address in addresses {
        let before = old.resource(address).unwrap_or(&empty);
        let after = new.resource(address).unwrap_or(&empty);
        for diff in diff_attributes(&before.attributes, &after.attributes) {
            diffs.push(prefixed(address, diff));
        }
    }
    diffs
}

/// Changes a plan would make to bring `address` to `desired`. Only keys in
/// `desired` are compared; an untracked resource plans every key as added.
pub fn plan_resource(
    state: &TestState,
    address: &str,
    desired: &Attributes,
) -> Vec<AttributeDiff> {
    let empty = Attributes::new();
    let current = state
        .resource(address)
        .map(|r| &r.attributes)
        .unwrap_or(&empty);

    desired
        .iter()
        .filter_map(|(key, want)| match current.get(key) {
            None => Some(AttributeDiff::Added {
                key: key.clone(),
                value: want.clone(),
            }),
            Some(have) if have != want => Some(AttributeDiff::Changed {
                key: key.clone(),
                old: have.clone(),
                new: want.clone(),
            }),
            Some(_) => None,
        })
        .map(|diff| prefixed(address, diff))
        .collect()
}

fn prefixed(address: &str, diff: AttributeDiff) -> AttributeDiff {
    let key = |k: String| format!("{}.{}", address, k);
    match diff {
        AttributeDiff::Added { key: k, value } => AttributeDiff::Added { key: key(k), value },
        AttributeDiff::Removed { key: k, old } => AttributeDiff::Removed { key: key(k), old },
        AttributeDiff::Changed { key: k, old, new } => AttributeDiff::Changed {
            key: key(k),
            old,
            new,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flatten_lists_and_blocks() {
        let attrs = flatten_attributes(&row(json!({
            "id": "ws-1",
            "network_ids": ["master", "standby"],
            "ad_domain": [{"name": "example.com"}],
            "internet_access_port": 9001,
            "enabled": true,
            "gone": null
        })));
        assert_eq!(attrs["network_ids.#"], "2");
        assert_eq!(attrs["network_ids.0"], "master");
        assert_eq!(attrs["network_ids.1"], "standby");
        assert_eq!(attrs["ad_domain.0.name"], "example.com");
        assert!(!attrs.contains_key("ad_domain.0.%"));
        assert_eq!(attrs["internet_access_port"], "9001");
        assert_eq!(attrs["enabled"], "true");
        assert!(!attrs.contains_key("gone"));
    }

    #[test]
    fn test_diff_attributes() {
        let old: Attributes = [("a", "1"), ("b", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let new: Attributes = [("b", "3"), ("c", "4")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let keys: Vec<String> = diff_attributes(&old, &new)
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(keys, ["- a = \"1\"", "~ b: \"2\" -> \"3\"", "+ c = \"4\""]);
        assert!(diff_attributes(&old, &old).is_empty());
    }

    #[test]
    fn test_diff_states_prefixes_address() {
        let before = TestState::new().with(
            "hcso_workspace_service.test",
            ResourceState::from_row(&row(json!({"id": "ws", "status": "SUBSCRIBING"}))),
        );
        let after = TestState::new().with(
            "hcso_workspace_service.test",
            ResourceState::from_row(&row(json!({"id": "ws", "status": "SUBSCRIBED"}))),
        );
        let diffs = diff_states(&before, &after);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].key(), "hcso_workspace_service.test.status");
    }

    #[test]
    fn test_plan_resource_ignores_computed_keys() {
        let state = TestState::new().with(
            "hcso_workspace_service.test",
            ResourceState::from_row(&row(json!({
                "id": "ws",
                "internet_access_port": 443,
                "status": "SUBSCRIBED"
            }))),
        );
        let desired = flatten_attributes(&row(json!({"internet_access_port": 443})));
        assert!(plan_resource(&state, "hcso_workspace_service.test", &desired).is_empty());

        let desired = flatten_attributes(&row(json!({
            "internet_access_port": 9001,
            "enterprise_id": "tf-acc"
        })));
        let plan: Vec<String> = plan_resource(&state, "hcso_workspace_service.test", &desired)
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(
            plan,
            [
                "+ hcso_workspace_service.test.enterprise_id = \"tf-acc\"",
                "~ hcso_workspace_service.test.internet_access_port: \"443\" -> \"9001\"",
            ]
        );
    }

    #[test]
    fn test_id_attribute_lookup() {
        let state = TestState::new().with(
            "hcso_vpc_subnet.master",
            ResourceState {
                id: "subnet-1".into(),
                attributes: Attributes::new(),
            },
        );
        assert_eq!(state.attribute("hcso_vpc_subnet.master", "id"), Some("subnet-1"));
        assert_eq!(state.attribute("hcso_vpc_subnet.master", "name"), None);
        assert_eq!(state.attribute("hcso_vpc.test", "id"), None);
    }
}
