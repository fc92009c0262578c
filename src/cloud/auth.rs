//! Authentication
//!
//! Resolves the IAM token used for API calls and the default
//! region/project from the environment.

use crate::config::Config;
use crate::error::{Error, Result};
use std::fmt;

/// Header carrying the IAM token on every request
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Credentials holder
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Security: never print the token
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Resolve credentials (HCSO_AUTH_TOKEN > config file)
    pub fn resolve(config: &Config) -> Result<Self> {
        let token = std::env::var("HCSO_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| config.auth_token.clone())
            .ok_or_else(|| {
                Error::Config("no auth token; set HCSO_AUTH_TOKEN".to_string())
            })?;

        Ok(Self::new(token.trim()))
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Validate a region name, e.g. `cn-north-4` or `ap-southeast-1`
/// Lowercase letters, digits and hyphens, at least two segments
pub fn validate_region(region: &str) -> bool {
    if region.is_empty() || region.len() > 64 {
        return false;
    }
    if region.starts_with('-') || region.ends_with('-') || !region.contains('-') {
        return false;
    }
    region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Validate a project ID: 32 lowercase hex characters
pub fn validate_project_id(project: &str) -> bool {
    project.len() == 32 && project.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Read the default region from the environment
/// Security: Validates region format before returning
pub fn get_default_region() -> Option<String> {
    for var in ["HCSO_REGION_NAME", "HW_REGION_NAME"] {
        if let Ok(region) = std::env::var(var) {
            if validate_region(&region) {
                return Some(region);
            }
            tracing::warn!("Invalid region format in {}", var);
        }
    }
    None
}

/// Read the default project ID from the environment
pub fn get_default_project() -> Option<String> {
    for var in ["HCSO_PROJECT_ID", "HW_PROJECT_ID"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }
    None
}
