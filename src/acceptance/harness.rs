//! Multi-step test runner
//!
//! A [`TestCase`] drives a [`Provisioner`] through its steps:
//!
//! - `Apply`: apply the config, refresh, require an empty diff between the
//!   applied and refreshed state and an empty plan against the refreshed
//!   state, then run every check and report all failures together.
//! - `Import`: import the resource by the ID held in state and compare the
//!   imported attributes with state, skipping ignored key prefixes.
//!
//! After the last step (or the first failure) the provisioner destroys
//! everything and the bound [`ResourceCheck`] confirms the object is gone.

use super::check::{Check, ResourceCheck};
use super::state::{diff_attributes, diff_states, AttributeDiff, ResourceState, TestState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error as ThisError;

/// Applies configurations and reports the resulting state
#[async_trait]
pub trait Provisioner: Send {
    type Config: Send + Sync;

    async fn apply(&mut self, config: &Self::Config) -> Result<TestState>;
    async fn refresh(&mut self) -> Result<TestState>;
    /// Changes still needed to bring `state` to `config`
    async fn plan(
        &mut self,
        config: &Self::Config,
        state: &TestState,
    ) -> Result<Vec<AttributeDiff>>;
    async fn import(&mut self, resource_name: &str, id: &str) -> Result<ResourceState>;
    async fn destroy(&mut self) -> Result<()>;
}

/// One step of a test case
#[derive(Debug, Clone)]
pub enum TestStep<C> {
    Apply {
        config: C,
        checks: Vec<Check>,
    },
    Import {
        resource_name: String,
        /// Attribute key prefixes excluded from import verification
        verify_ignore: Vec<String>,
    },
}

impl<C> TestStep<C> {
    pub fn apply(config: C, checks: Vec<Check>) -> Self {
        TestStep::Apply { config, checks }
    }

    pub fn import(resource_name: &str, verify_ignore: &[&str]) -> Self {
        TestStep::Import {
            resource_name: resource_name.to_string(),
            verify_ignore: verify_ignore.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Failure of a test case
#[derive(Debug, ThisError)]
pub enum HarnessError {
    #[error("step {step}: {source}")]
    Provider { step: usize, source: Error },

    #[error("step {step}: {resource} is not in state")]
    MissingResource { step: usize, resource: String },

    #[error("step {step}: plan not empty after apply: {}", Listed(.diffs))]
    NotConverged { step: usize, diffs: Vec<AttributeDiff> },

    #[error("step {step}: check failed: {}", .failures.join("; "))]
    CheckFailed { step: usize, failures: Vec<String> },

    #[error("step {step}: imported {resource} differs from state: {}", Listed(.diffs))]
    ImportMismatch {
        step: usize,
        resource: String,
        diffs: Vec<AttributeDiff>,
    },

    #[error("destroy: {0}")]
    Destroy(#[source] Error),
}

struct Listed<'a>(&'a [AttributeDiff]);

impl fmt::Display for Listed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diff) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", diff)?;
        }
        Ok(())
    }
}

/// A sequence of steps sharing one destroy check
pub struct TestCase<C> {
    pub resource_check: Option<ResourceCheck>,
    pub steps: Vec<TestStep<C>>,
}

impl<C: Send + Sync> TestCase<C> {
    pub fn new(resource_check: ResourceCheck, steps: Vec<TestStep<C>>) -> Self {
        Self {
            resource_check: Some(resource_check),
            steps,
        }
    }

    /// Run every step, then destroy. Returns the state after the last step.
    /// A step failure wins over a destroy failure.
    pub async fn run<P>(&self, provisioner: &mut P) -> std::result::Result<TestState, HarnessError>
    where
        P: Provisioner<Config = C>,
    {
        let mut state = TestState::new();
        let outcome = self.run_steps(provisioner, &mut state).await;
        let teardown = self.teardown(provisioner, &state).await;
        outcome?;
        teardown?;
        Ok(state)
    }

    async fn run_steps<P>(
        &self,
        provisioner: &mut P,
        state: &mut TestState,
    ) -> std::result::Result<(), HarnessError>
    where
        P: Provisioner<Config = C>,
    {
        for (index, step) in self.steps.iter().enumerate() {
            let step_no = index + 1;
            match step {
                TestStep::Apply { config, checks } => {
                    tracing::info!("Step {}: apply", step_no);
                    *state = self
                        .apply_step(provisioner, step_no, state, config, checks)
                        .await?;
                }
                TestStep::Import {
                    resource_name,
                    verify_ignore,
                } => {
                    tracing::info!("Step {}: import {}", step_no, resource_name);
                    import_step(provisioner, step_no, state, resource_name, verify_ignore).await?;
                }
            }
        }
        Ok(())
    }

    async fn apply_step<P>(
        &self,
        provisioner: &mut P,
        step: usize,
        previous: &TestState,
        config: &C,
        checks: &[Check],
    ) -> std::result::Result<TestState, HarnessError>
    where
        P: Provisioner<Config = C>,
    {
        let provider = |source| HarnessError::Provider { step, source };

        let applied = provisioner.apply(config).await.map_err(provider)?;
        for diff in diff_states(previous, &applied) {
            tracing::debug!("Step {}: {}", step, diff);
        }
        let refreshed = provisioner.refresh().await.map_err(provider)?;

        let diffs = diff_states(&applied, &refreshed);
        if !diffs.is_empty() {
            return Err(HarnessError::NotConverged { step, diffs });
        }
        let planned = provisioner.plan(config, &refreshed).await.map_err(provider)?;
        if !planned.is_empty() {
            return Err(HarnessError::NotConverged {
                step,
                diffs: planned,
            });
        }

        let mut failures = Vec::new();
        for check in checks {
            match check {
                Check::Exists => match &self.resource_check {
                    Some(rc) => {
                        if let Err(e) = rc.check_exists(&refreshed).await {
                            failures.push(format!("{}: {}", rc.resource_name(), e));
                        }
                    }
                    None => failures.push("exists check without a resource check".to_string()),
                },
                _ => {
                    if let Err(failure) = check.evaluate(&refreshed) {
                        failures.push(failure);
                    }
                }
            }
        }
        if !failures.is_empty() {
            return Err(HarnessError::CheckFailed { step, failures });
        }

        Ok(refreshed)
    }

    async fn teardown<P>(
        &self,
        provisioner: &mut P,
        state: &TestState,
    ) -> std::result::Result<(), HarnessError>
    where
        P: Provisioner<Config = C>,
    {
        tracing::info!("Destroying test resources");
        provisioner.destroy().await.map_err(HarnessError::Destroy)?;
        if let Some(rc) = &self.resource_check {
            rc.check_destroyed(state).await.map_err(HarnessError::Destroy)?;
        }
        Ok(())
    }
}

async fn import_step<P: Provisioner>(
    provisioner: &mut P,
    step: usize,
    state: &TestState,
    resource_name: &str,
    verify_ignore: &[String],
) -> std::result::Result<(), HarnessError> {
    let tracked = state
        .resource(resource_name)
        .ok_or_else(|| HarnessError::MissingResource {
            step,
            resource: resource_name.to_string(),
        })?;

    let imported = provisioner
        .import(resource_name, &tracked.id)
        .await
        .map_err(|source| HarnessError::Provider { step, source })?;

    let diffs: Vec<AttributeDiff> = diff_attributes(&tracked.attributes, &imported.attributes)
        .into_iter()
        .filter(|diff| !is_ignored(diff.key(), verify_ignore))
        .collect();
    if !diffs.is_empty() {
        return Err(HarnessError::ImportMismatch {
            step,
            resource: resource_name.to_string(),
            diffs,
        });
    }
    Ok(())
}

/// Prefix match on whole key segments: `ad_domain.0.password` ignores
/// `ad_domain.0.password` but not `ad_domain.0.password_hint`.
fn is_ignored(key: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        key.strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_prefix_matches_segments() {
        let ignore = vec!["ad_domain.0.password".to_string(), "network_ids".to_string()];
        assert!(is_ignored("ad_domain.0.password", &ignore));
        assert!(!is_ignored("ad_domain.0.password_hint", &ignore));
        assert!(is_ignored("network_ids.#", &ignore));
        assert!(is_ignored("network_ids.1", &ignore));
        assert!(!is_ignored("vpc_id", &ignore));
    }

    #[test]
    fn test_step_builders() {
        let step: TestStep<()> = TestStep::import("hcso_workspace_service.test", &["ad_domain.0.password"]);
        match step {
            TestStep::Import {
                resource_name,
                verify_ignore,
            } => {
                assert_eq!(resource_name, "hcso_workspace_service.test");
                assert_eq!(verify_ignore, ["ad_domain.0.password"]);
            }
            TestStep::Apply { .. } => panic!("expected import step"),
        }
    }
}
