//! hcso - provider core for a sovereign-cloud tenant
//!
//! Read-side data sources and resource lifecycle handlers against the
//! vendor REST APIs, plus the acceptance harness that exercises them.
//!
//! # Module Structure
//!
//! - [`cloud`] - Credentials, HTTP transport and the explicit client handle
//! - [`pipeline`] - Query filters, marker pagination and record flattening
//! - [`resource`] - Data sources and the Workspace service resource
//! - [`acceptance`] - Multi-step acceptance tests against a provisioner
//! - [`config`] - Persistent configuration
//! - [`error`] - Error types

pub mod acceptance;
pub mod cloud;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resource;

pub use error::{Error, Result};

/// Version injected at compile time via HCSO_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("HCSO_VERSION") {
    Some(v) => v,
    None => "dev",
};
