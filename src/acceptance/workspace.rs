//! Live Workspace service provisioner
//!
//! Drives the real API through the functions in
//! [`workspace_service`](crate::resource::workspace_service).

use super::check::ResourceGetter;
use super::harness::Provisioner;
use super::state::{flatten_attributes, plan_resource, AttributeDiff, ResourceState, TestState};
use crate::cloud::CloudClient;
use crate::error::Result;
use crate::resource::workspace_service::{
    apply_service, destroy_service, read_service, service_row, with_write_only, ServiceConfig,
    WaitSettings,
};
use async_trait::async_trait;
use serde_json::Value;

/// Reads the service with the tombstone applied
pub struct ServiceGetter {
    client: CloudClient,
}

impl ServiceGetter {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceGetter for ServiceGetter {
    async fn get(&self, _state: &ResourceState) -> Result<Value> {
        read_service(&self.client).await
    }
}

/// Plan for a Workspace service at `address`: every configured attribute
/// that the tracked state does not show yet
pub fn plan_service(
    address: &str,
    config: &ServiceConfig,
    state: &TestState,
) -> Vec<AttributeDiff> {
    plan_resource(state, address, &flatten_attributes(&config.desired_row()))
}

/// Provisions the project's Workspace service under one resource address
pub struct WorkspaceServiceProvisioner {
    client: CloudClient,
    resource_name: String,
    wait: WaitSettings,
    config: Option<ServiceConfig>,
}

impl WorkspaceServiceProvisioner {
    pub fn new(client: CloudClient, resource_name: &str) -> Self {
        Self {
            client,
            resource_name: resource_name.to_string(),
            wait: WaitSettings::default(),
            config: None,
        }
    }

    pub fn wait(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    async fn observe(&self) -> Result<ResourceState> {
        let row = service_row(&read_service(&self.client).await?)?;
        let row = match &self.config {
            Some(config) => with_write_only(row, config),
            None => row,
        };
        Ok(ResourceState::from_row(&row))
    }
}

#[async_trait]
impl Provisioner for WorkspaceServiceProvisioner {
    type Config = ServiceConfig;

    async fn apply(&mut self, config: &ServiceConfig) -> Result<TestState> {
        apply_service(&self.client, config, self.wait).await?;
        self.config = Some(config.clone());
        self.refresh().await
    }

    async fn refresh(&mut self) -> Result<TestState> {
        let state = self.observe().await?;
        Ok(TestState::new().with(&self.resource_name, state))
    }

    async fn plan(
        &mut self,
        config: &ServiceConfig,
        state: &TestState,
    ) -> Result<Vec<AttributeDiff>> {
        Ok(plan_service(&self.resource_name, config, state))
    }

    async fn import(&mut self, resource_name: &str, id: &str) -> Result<ResourceState> {
        tracing::info!("Importing {} as {}", id, resource_name);
        let row = service_row(&read_service(&self.client).await?)?;
        Ok(ResourceState::from_row(&row))
    }

    async fn destroy(&mut self) -> Result<()> {
        destroy_service(&self.client, self.wait).await?;
        self.config = None;
        Ok(())
    }
}
