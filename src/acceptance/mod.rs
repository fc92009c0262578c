//! Acceptance testing harness
//!
//! Multi-step tests against a provisioner: apply, verify convergence and
//! attributes, import, then destroy and confirm the remote object is gone.
//!
//! # Module Structure
//!
//! - [`state`] - Flat attribute state and diffs
//! - [`check`] - Existence checks and attribute assertions
//! - [`harness`] - Test cases, steps and the provisioner trait
//! - [`workspace`] - Live provisioner for the Workspace service
//!
//! # Example
//!
//! ```ignore
//! let name = "hcso_workspace_service.test";
//! let case = TestCase::new(
//!     ResourceCheck::new(name, ServiceGetter::new(client.clone())),
//!     vec![
//!         TestStep::apply(config, vec![Check::Exists, Check::attr(name, "network_ids.#", "1")]),
//!         TestStep::import(name, &["ad_domain.0.password"]),
//!     ],
//! );
//! case.run(&mut WorkspaceServiceProvisioner::new(client, name)).await?;
//! ```

pub mod check;
pub mod harness;
pub mod state;
pub mod workspace;

pub use check::{Check, ResourceCheck, ResourceGetter};
pub use harness::{HarnessError, Provisioner, TestCase, TestStep};
pub use state::{AttributeDiff, ResourceState, TestState};
pub use workspace::{plan_service, ServiceGetter, WorkspaceServiceProvisioner};

/// Environment variable that enables live acceptance tests
pub const ACC_ENV: &str = "HCSO_ACC";

/// Prefix of every name generated for test resources
pub const NAME_PREFIX: &str = "tf-acc-test";

/// Whether live acceptance tests should run
pub fn acceptance_enabled() -> bool {
    std::env::var(ACC_ENV).is_ok_and(|v| !v.is_empty() && v != "0")
}

/// `tf-acc-test-<random>`, usable where names allow dashes
pub fn random_resource_name_with_dash() -> String {
    format!("{}-{}", NAME_PREFIX, random_suffix())
}

/// `tf_acc_test_<random>`, for names that only allow underscores
pub fn random_resource_name() -> String {
    format!("{}_{}", NAME_PREFIX.replace('-', "_"), random_suffix())
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_names() {
        let a = random_resource_name_with_dash();
        let b = random_resource_name_with_dash();
        assert!(a.starts_with("tf-acc-test-"));
        assert_eq!(a.len(), "tf-acc-test-".len() + 8);
        assert_ne!(a, b);
        assert!(random_resource_name().starts_with("tf_acc_test_"));
    }
}
