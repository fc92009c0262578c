//! Existence checks and attribute assertions

use super::state::{ResourceState, TestState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Fetches the remote object behind a tracked resource
#[async_trait]
pub trait ResourceGetter: Send + Sync {
    /// Return the raw object. Absence is reported as an error for which
    /// [`Error::is_not_found`] holds.
    async fn get(&self, state: &ResourceState) -> Result<Value>;
}

/// Existence checker bound to one resource address
pub struct ResourceCheck {
    resource_name: String,
    getter: Box<dyn ResourceGetter>,
}

impl ResourceCheck {
    pub fn new(resource_name: impl Into<String>, getter: impl ResourceGetter + 'static) -> Self {
        Self {
            resource_name: resource_name.into(),
            getter: Box::new(getter),
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    fn tracked<'a>(&self, state: &'a TestState) -> Option<&'a ResourceState> {
        state.resource(&self.resource_name)
    }

    /// The resource is in state and the remote object exists
    pub async fn check_exists(&self, state: &TestState) -> Result<Value> {
        let tracked = self
            .tracked(state)
            .ok_or_else(|| Error::State(format!("{} is not in state", self.resource_name)))?;
        self.getter.get(tracked).await
    }

    /// The remote object is gone. Not-found and HTTP 404 both count as gone.
    /// An untracked resource is looked up with an empty state.
    pub async fn check_destroyed(&self, state: &TestState) -> Result<()> {
        let untracked = ResourceState::default();
        let tracked = self.tracked(state).unwrap_or(&untracked);
        match self.getter.get(tracked).await {
            Ok(_) => Err(Error::State(format!(
                "{} ({}) still exists",
                self.resource_name, tracked.id
            ))),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Assertion run after an apply step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The bound resource exists remotely
    Exists,
    /// `resource.key == value`
    Attr {
        resource: String,
        key: String,
        value: String,
    },
    /// `resource.key` is present and non-empty
    AttrSet { resource: String, key: String },
    /// `resource.key == other.other_key`
    AttrPair {
        resource: String,
        key: String,
        other: String,
        other_key: String,
    },
}

impl Check {
    pub fn attr(resource: &str, key: &str, value: impl Into<String>) -> Self {
        Check::Attr {
            resource: resource.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn attr_set(resource: &str, key: &str) -> Self {
        Check::AttrSet {
            resource: resource.into(),
            key: key.into(),
        }
    }

    pub fn attr_pair(resource: &str, key: &str, other: &str, other_key: &str) -> Self {
        Check::AttrPair {
            resource: resource.into(),
            key: key.into(),
            other: other.into(),
            other_key: other_key.into(),
        }
    }

    /// Evaluate a state-only check. `Exists` needs a getter and always passes here.
    pub fn evaluate(&self, state: &TestState) -> std::result::Result<(), String> {
        match self {
            Check::Exists => Ok(()),
            Check::Attr {
                resource,
                key,
                value,
            } => match state.attribute(resource, key) {
                Some(actual) if actual == value => Ok(()),
                Some(actual) => Err(format!(
                    "{}.{}: expected {:?}, got {:?}",
                    resource, key, value, actual
                )),
                None => Err(format!("{}.{}: expected {:?}, not set", resource, key, value)),
            },
            Check::AttrSet { resource, key } => match state.attribute(resource, key) {
                Some(actual) if !actual.is_empty() => Ok(()),
                _ => Err(format!("{}.{}: expected to be set", resource, key)),
            },
            Check::AttrPair {
                resource,
                key,
                other,
                other_key,
            } => {
                let left = state.attribute(resource, key);
                let right = state.attribute(other, other_key);
                if left.is_some() && left == right {
                    Ok(())
                } else {
                    Err(format!(
                        "{}.{} ({:?}) does not match {}.{} ({:?})",
                        resource, key, left, other, other_key, right
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptance::state::Attributes;
    use serde_json::json;

    struct Fixed(fn() -> Result<Value>);

    #[async_trait]
    impl ResourceGetter for Fixed {
        async fn get(&self, _state: &ResourceState) -> Result<Value> {
            (self.0)()
        }
    }

    fn state() -> TestState {
        let attrs = |pairs: &[(&str, &str)]| -> Attributes {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        TestState::new()
            .with(
                "hcso_vpc_subnet.master",
                ResourceState {
                    id: "subnet-1".into(),
                    attributes: attrs(&[("id", "subnet-1"), ("name", "master")]),
                },
            )
            .with(
                "hcso_workspace_service.test",
                ResourceState {
                    id: "ws-1".into(),
                    attributes: attrs(&[("network_ids.#", "1"), ("network_ids.0", "subnet-1")]),
                },
            )
    }

    #[test]
    fn test_attr_checks() {
        let state = state();
        assert!(Check::attr("hcso_vpc_subnet.master", "name", "master")
            .evaluate(&state)
            .is_ok());
        assert!(Check::attr("hcso_vpc_subnet.master", "name", "standby")
            .evaluate(&state)
            .is_err());
        assert!(Check::attr_set("hcso_workspace_service.test", "network_ids.0")
            .evaluate(&state)
            .is_ok());
        assert!(Check::attr_set("hcso_workspace_service.test", "network_ids.1")
            .evaluate(&state)
            .is_err());
        assert!(Check::attr_pair(
            "hcso_workspace_service.test",
            "network_ids.0",
            "hcso_vpc_subnet.master",
            "id"
        )
        .evaluate(&state)
        .is_ok());
    }

    #[tokio::test]
    async fn test_destroyed_accepts_not_found_and_404() {
        let state = state();
        let tombstoned = ResourceCheck::new(
            "hcso_workspace_service.test",
            Fixed(|| Err(Error::NotFound("closed".into()))),
        );
        assert!(tombstoned.check_destroyed(&state).await.is_ok());

        let missing = ResourceCheck::new(
            "hcso_workspace_service.test",
            Fixed(|| {
                Err(Error::Api {
                    status: 404,
                    message: String::new(),
                })
            }),
        );
        assert!(missing.check_destroyed(&state).await.is_ok());

        let alive = ResourceCheck::new(
            "hcso_workspace_service.test",
            Fixed(|| Ok(json!({"status": "SUBSCRIBED"}))),
        );
        assert!(alive.check_destroyed(&state).await.is_err());
        assert!(alive.check_exists(&state).await.is_ok());
    }

    #[tokio::test]
    async fn test_other_errors_are_not_destroyed() {
        let check = ResourceCheck::new(
            "hcso_workspace_service.test",
            Fixed(|| {
                Err(Error::Api {
                    status: 500,
                    message: String::new(),
                })
            }),
        );
        let err = check.check_destroyed(&state()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_destroyed_looks_up_untracked_resource() {
        let empty = TestState::new();
        let leaked = ResourceCheck::new(
            "hcso_workspace_service.test",
            Fixed(|| Ok(json!({"status": "SUBSCRIBED"}))),
        );
        assert!(leaked.check_destroyed(&empty).await.is_err());

        let gone = ResourceCheck::new(
            "hcso_workspace_service.test",
            Fixed(|| Err(Error::NotFound("closed".into()))),
        );
        assert!(gone.check_destroyed(&empty).await.is_ok());
    }

    #[tokio::test]
    async fn test_exists_requires_tracked_resource() {
        let check = ResourceCheck::new("hcso_vpc.absent", Fixed(|| Ok(json!({}))));
        assert!(check.check_exists(&state()).await.is_err());
    }
}
