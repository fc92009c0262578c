//! Configuration Management
//!
//! Handles persistent configuration storage for hcso. Values resolve in
//! the order CLI flag > config file > environment.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default cloud domain used to build service endpoints
pub const DEFAULT_CLOUD: &str = "myhuaweicloud.com";

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default bound on pages followed by a single read
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Cloud domain, e.g. `myhuaweicloud.com`
    #[serde(default)]
    pub cloud: Option<String>,
    /// IAM token. Prefer HCSO_AUTH_TOKEN over storing it on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Per-service endpoint overrides, keyed by service name (`vpc`, `workspace`)
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hcso").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Copy safe to print: a stored token is masked
    pub fn redacted(&self) -> Self {
        Self {
            auth_token: self.auth_token.as_ref().map(|_| "****".to_string()),
            ..self.clone()
        }
    }

    /// Get effective region (config > environment)
    pub fn effective_region(&self) -> Option<String> {
        self.region
            .clone()
            .or_else(crate::cloud::auth::get_default_region)
    }

    /// Get effective project ID (config > environment)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::cloud::auth::get_default_project)
    }

    /// Get effective cloud domain
    pub fn effective_cloud(&self) -> String {
        self.cloud
            .clone()
            .or_else(|| std::env::var("HCSO_CLOUD").ok())
            .unwrap_or_else(|| DEFAULT_CLOUD.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages.unwrap_or(DEFAULT_MAX_PAGES).max(1)
    }

    /// Set region and save
    pub fn set_region(&mut self, region: &str) -> Result<()> {
        self.region = Some(region.to_string());
        self.save()
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.save()
    }
}
