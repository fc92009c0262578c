//! Cloud Client
//!
//! Main client for the vendor REST APIs, combining configuration,
//! credentials and HTTP functionality. Every handler receives a
//! `CloudClient` explicitly; there is no ambient global configuration.

use super::auth::{validate_project_id, validate_region, Credentials};
use super::http::HttpClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Main cloud client
#[derive(Debug, Clone)]
pub struct CloudClient {
    pub credentials: Credentials,
    pub http: HttpClient,
    pub region: String,
    pub project_id: String,
    cloud: String,
    endpoints: Arc<HashMap<String, String>>,
    max_pages: usize,
}

impl CloudClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let credentials = Credentials::resolve(config)?;
        Self::with_credentials(config, credentials)
    }

    /// Create a client with explicit credentials
    pub fn with_credentials(config: &Config, credentials: Credentials) -> Result<Self> {
        let region = config
            .effective_region()
            .ok_or_else(|| Error::Config("no region configured; set HCSO_REGION_NAME".into()))?;
        if !validate_region(&region) {
            return Err(Error::Config(format!("invalid region: {}", region)));
        }

        let project_id = config.effective_project().unwrap_or_default();
        if !project_id.is_empty() && !validate_project_id(&project_id) {
            return Err(Error::Config(format!("invalid project ID: {}", project_id)));
        }

        Ok(Self {
            credentials,
            http: HttpClient::new(config.timeout())?,
            region,
            project_id,
            cloud: config.effective_cloud(),
            endpoints: Arc::new(config.endpoints.clone()),
            max_pages: config.max_pages(),
        })
    }

    /// Same client targeting another region
    pub fn for_region(&self, region: &str) -> Result<Self> {
        if !validate_region(region) {
            return Err(Error::Config(format!("invalid region: {}", region)));
        }
        let mut client = self.clone();
        client.region = region.to_string();
        Ok(client)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Project ID, required by project-scoped APIs
    pub fn require_project(&self) -> Result<&str> {
        if self.project_id.is_empty() {
            return Err(Error::Config(
                "no project ID configured; set HCSO_PROJECT_ID".into(),
            ));
        }
        Ok(&self.project_id)
    }

    /// Base endpoint for a service, e.g. `https://vpc.cn-north-4.myhuaweicloud.com`
    pub fn endpoint(&self, service: &str) -> String {
        match self.endpoints.get(service) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}.{}", service, self.region, self.cloud),
        }
    }

    /// Build a full URL for a service path
    pub fn service_url(&self, service: &str, path: &str) -> Result<String> {
        let base = url::Url::parse(&format!("{}/", self.endpoint(service)))
            .map_err(|e| Error::Config(format!("invalid {} endpoint: {}", service, e)))?;
        let url = base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("invalid path {}: {}", path, e)))?;
        Ok(url.to_string())
    }

    /// Make a GET request
    pub async fn get(&self, service: &str, path: &str, query: &[(String, String)]) -> Result<Value> {
        let url = self.service_url(service, path)?;
        self.http.get(&url, self.credentials.token(), query).await
    }

    /// Make a POST request
    pub async fn post(&self, service: &str, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.service_url(service, path)?;
        self.http.post(&url, self.credentials.token(), body).await
    }

    /// Make a PUT request
    pub async fn put(&self, service: &str, path: &str, body: &Value) -> Result<Value> {
        let url = self.service_url(service, path)?;
        self.http.put(&url, self.credentials.token(), body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, service: &str, path: &str) -> Result<Value> {
        let url = self.service_url(service, path)?;
        self.http.delete(&url, self.credentials.token()).await
    }
}

#[async_trait]
impl Transport for CloudClient {
    async fn get(&self, service: &str, path: &str, query: &[(String, String)]) -> Result<Value> {
        CloudClient::get(self, service, path, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoints: &[(&str, &str)]) -> CloudClient {
        let config = Config {
            region: Some("cn-north-4".into()),
            project_id: Some("0123456789abcdef0123456789abcdef".into()),
            endpoints: endpoints
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        CloudClient::with_credentials(&config, Credentials::new("token")).unwrap()
    }

    #[test]
    fn test_default_endpoint() {
        let client = client(&[]);
        assert_eq!(client.endpoint("vpc"), "https://vpc.cn-north-4.myhuaweicloud.com");
        assert_eq!(
            client.service_url("vpc", "/v2.0/vpc/routes").unwrap(),
            "https://vpc.cn-north-4.myhuaweicloud.com/v2.0/vpc/routes"
        );
    }

    #[test]
    fn test_endpoint_override_keeps_base_path() {
        let client = client(&[("vpc", "http://127.0.0.1:9000/proxy/")]);
        assert_eq!(
            client.service_url("vpc", "/v2.0/vpc/routes").unwrap(),
            "http://127.0.0.1:9000/proxy/v2.0/vpc/routes"
        );
    }

    #[test]
    fn test_for_region() {
        let client = client(&[]).for_region("ap-southeast-1").unwrap();
        assert_eq!(client.endpoint("workspace"), "https://workspace.ap-southeast-1.myhuaweicloud.com");
        assert!(client.for_region("bad region").is_err());
    }
}
