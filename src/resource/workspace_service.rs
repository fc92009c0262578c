//! Workspace service resource
//!
//! The Workspace (virtual desktop) service is a per-project singleton under
//! `/v2/{project_id}/workspaces`. Once closed, the API keeps answering GET
//! with `status: "CLOSED"`; that status means the service does not exist.

use crate::cloud::CloudClient;
use crate::error::{Error, Result};
use crate::pipeline::{FieldRule, Row, RowMapper};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const SERVICE: &str = "workspace";

/// Tombstone status of a closed service
pub const STATUS_CLOSED: &str = "CLOSED";
pub const STATUS_SUBSCRIBED: &str = "SUBSCRIBED";

const FAILED_STATUSES: &[&str] = &["SUBSCRIPTION_FAILED", "DEREGISTRATION_FAILED"];

pub const AUTH_LITE_AS: &str = "LITE_AS";
pub const AUTH_LOCAL_AD: &str = "LOCAL_AD";

const SECURITY_GROUP_FIELDS: &[FieldRule] = &[
    FieldRule::string("id", "id"),
    FieldRule::string("name", "name"),
];

const AD_DOMAIN_FIELDS: &[FieldRule] = &[
    FieldRule::string("name", "domain_name"),
    FieldRule::string("admin_account", "domain_admin_account"),
    FieldRule::string("active_domain_ip", "active_domain_ip"),
    FieldRule::string("active_domain_name", "active_domain_name"),
    FieldRule::string("active_dns_ip", "active_dns_ip"),
    FieldRule::string("standby_domain_ip", "standby_domain_ip"),
    FieldRule::string("standby_domain_name", "standby_domain_name"),
    FieldRule::string("standby_dns_ip", "standby_dns_ip"),
];

const SERVICE_FIELDS: &[FieldRule] = &[
    FieldRule::string("id", "id"),
    FieldRule::string("auth_type", "ad_domains.domain_type"),
    FieldRule::block("ad_domain", "ad_domains", AD_DOMAIN_FIELDS),
    FieldRule::string("access_mode", "access_mode"),
    FieldRule::string("vpc_id", "vpc_id"),
    FieldRule::pluck("network_ids", "subnet_ids", "subnet_id"),
    FieldRule::string("enterprise_id", "enterprise_id"),
    FieldRule::string("management_subnet_cidr", "management_subnet_cidr"),
    FieldRule::block(
        "infrastructure_security_group",
        "infrastructure_security_group",
        SECURITY_GROUP_FIELDS,
    ),
    FieldRule::block("desktop_security_group", "desktop_security_group", SECURITY_GROUP_FIELDS),
    FieldRule::integer("internet_access_port", "internet_access_port"),
    FieldRule::string("internet_access_address", "internet_access_address"),
    FieldRule::string("status", "status"),
];

pub const SERVICE_MAPPER: RowMapper = RowMapper::new(SERVICE_FIELDS);

fn default_auth_type() -> String {
    AUTH_LITE_AS.to_string()
}

/// Active Directory settings for `LOCAL_AD` services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdDomain {
    pub name: String,
    pub admin_account: String,
    /// Write-only; the API never returns it
    pub password: String,
    pub active_domain_ip: String,
    #[serde(default)]
    pub active_domain_name: Option<String>,
    #[serde(default)]
    pub active_dns_ip: Option<String>,
}

/// Desired configuration of the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    pub access_mode: String,
    pub vpc_id: String,
    pub network_ids: Vec<String>,
    #[serde(default)]
    pub ad_domain: Option<AdDomain>,
    #[serde(default)]
    pub internet_access_port: Option<u16>,
    #[serde(default)]
    pub enterprise_id: Option<String>,
}

impl ServiceConfig {
    fn ad_domains_body(&self) -> Value {
        match &self.ad_domain {
            Some(ad) if self.auth_type == AUTH_LOCAL_AD => {
                let mut body = json!({
                    "domain_type": AUTH_LOCAL_AD,
                    "domain_name": ad.name,
                    "domain_admin_account": ad.admin_account,
                    "domain_password": ad.password,
                    "active_domain_ip": ad.active_domain_ip,
                });
                if let Some(name) = &ad.active_domain_name {
                    body["active_domain_name"] = json!(name);
                }
                if let Some(ip) = &ad.active_dns_ip {
                    body["active_dns_ip"] = json!(ip);
                }
                body
            }
            _ => json!({ "domain_type": self.auth_type }),
        }
    }

    fn subnet_ids_body(&self) -> Value {
        Value::Array(
            self.network_ids
                .iter()
                .map(|id| json!({ "subnet_id": id }))
                .collect(),
        )
    }

    /// Body of the open (POST) request
    pub fn open_body(&self) -> Value {
        let mut body = json!({
            "ad_domains": self.ad_domains_body(),
            "vpc_id": self.vpc_id,
            "subnet_ids": self.subnet_ids_body(),
            "access_mode": self.access_mode,
        });
        if let Some(enterprise_id) = &self.enterprise_id {
            body["enterprise_id"] = json!(enterprise_id);
        }
        body
    }

    /// Row the service is expected to flatten to once `self` is applied.
    /// Computed attributes are absent.
    pub fn desired_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("auth_type".into(), json!(self.auth_type));
        row.insert("access_mode".into(), json!(self.access_mode));
        row.insert("vpc_id".into(), json!(self.vpc_id));
        row.insert("network_ids".into(), json!(self.network_ids));
        if let Some(port) = self.internet_access_port {
            row.insert("internet_access_port".into(), json!(port));
        }
        if let Some(enterprise_id) = &self.enterprise_id {
            row.insert("enterprise_id".into(), json!(enterprise_id));
        }
        if let (AUTH_LOCAL_AD, Some(ad)) = (self.auth_type.as_str(), &self.ad_domain) {
            let mut domain = json!({
                "name": ad.name,
                "admin_account": ad.admin_account,
                "password": ad.password,
                "active_domain_ip": ad.active_domain_ip,
            });
            if let Some(name) = &ad.active_domain_name {
                domain["active_domain_name"] = json!(name);
            }
            if let Some(ip) = &ad.active_dns_ip {
                domain["active_dns_ip"] = json!(ip);
            }
            row.insert("ad_domain".into(), json!([domain]));
        }
        row
    }

    /// Body of the update (PUT) request against the observed row, `None` when nothing changed
    pub fn update_body(&self, current: &Row) -> Option<Value> {
        let mut body = Map::new();

        let current_networks: Vec<&str> = current
            .get("network_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if current_networks != self.network_ids.iter().map(String::as_str).collect::<Vec<_>>() {
            body.insert("subnet_ids".into(), self.subnet_ids_body());
        }

        if let Some(port) = self.internet_access_port {
            if current.get("internet_access_port").and_then(Value::as_u64) != Some(u64::from(port)) {
                body.insert("internet_access_port".into(), json!(port));
            }
        }

        if let Some(enterprise_id) = &self.enterprise_id {
            if current.get("enterprise_id").and_then(Value::as_str) != Some(enterprise_id.as_str()) {
                body.insert("enterprise_id".into(), json!(enterprise_id));
            }
        }

        if current.get("access_mode").and_then(Value::as_str) != Some(self.access_mode.as_str()) {
            body.insert("access_mode".into(), json!(self.access_mode));
        }

        if self.auth_type == AUTH_LOCAL_AD && ad_domain_changed(self.ad_domain.as_ref(), current) {
            body.insert("ad_domains".into(), self.ad_domains_body());
        }

        (!body.is_empty()).then_some(Value::Object(body))
    }
}

fn ad_domain_changed(desired: Option<&AdDomain>, current: &Row) -> bool {
    let Some(desired) = desired else {
        return false;
    };
    let observed = current
        .get("ad_domain")
        .and_then(|v| v.get(0))
        .cloned()
        .unwrap_or(Value::Null);
    let field = |key: &str| observed.get(key).and_then(Value::as_str).unwrap_or("").to_string();

    field("name") != desired.name
        || field("admin_account") != desired.admin_account
        || field("active_domain_ip") != desired.active_domain_ip
        || desired
            .active_domain_name
            .as_ref()
            .is_some_and(|n| field("active_domain_name") != *n)
        || desired
            .active_dns_ip
            .as_ref()
            .is_some_and(|ip| field("active_dns_ip") != *ip)
}

/// Polling settings while the service changes state
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    pub interval: Duration,
    pub attempts: usize,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            attempts: 180,
        }
    }
}

fn service_path(client: &CloudClient) -> Result<String> {
    Ok(format!("/v2/{}/workspaces", client.require_project()?))
}

/// Status of a raw service record
pub fn service_status(record: &Value) -> &str {
    record.get("status").and_then(Value::as_str).unwrap_or("")
}

/// Raw GET, tombstoned services included
pub async fn get_service(client: &CloudClient) -> Result<Value> {
    client.get(SERVICE, &service_path(client)?, &[]).await
}

/// Apply the tombstone convention: a closed service is `Error::NotFound`
pub fn existing_service(record: Value) -> Result<Value> {
    if service_status(&record) == STATUS_CLOSED {
        return Err(Error::NotFound(format!("workspace service is {}", STATUS_CLOSED)));
    }
    Ok(record)
}

/// GET with the tombstone applied
pub async fn read_service(client: &CloudClient) -> Result<Value> {
    existing_service(get_service(client).await?)
}

/// Flatten a service record
pub fn service_row(record: &Value) -> Result<Row> {
    SERVICE_MAPPER.map_record(record)
}

/// Put write-only settings the API never returns back into an observed row
pub fn with_write_only(mut row: Row, config: &ServiceConfig) -> Row {
    let Some(ad) = &config.ad_domain else {
        return row;
    };
    if let Some(Value::Object(domain)) = row
        .get_mut("ad_domain")
        .and_then(Value::as_array_mut)
        .and_then(|blocks| blocks.first_mut())
    {
        domain.insert("password".into(), json!(ad.password));
    }
    row
}

/// Open the service. Returns the job ID when the API reports one.
pub async fn open_service(client: &CloudClient, config: &ServiceConfig) -> Result<Option<String>> {
    tracing::info!("Opening workspace service in VPC {}", config.vpc_id);
    let response = client
        .post(SERVICE, &service_path(client)?, Some(&config.open_body()))
        .await?;
    Ok(job_id(&response))
}

/// Apply the changed fields of `config`. Returns false when nothing changed.
pub async fn update_service(
    client: &CloudClient,
    current: &Row,
    config: &ServiceConfig,
) -> Result<bool> {
    let Some(body) = config.update_body(current) else {
        tracing::debug!("Workspace service already matches configuration");
        return Ok(false);
    };
    tracing::info!(
        "Updating workspace service: {:?}",
        body.as_object().map(|b| b.keys().collect::<Vec<_>>())
    );
    client.put(SERVICE, &service_path(client)?, &body).await?;
    Ok(true)
}

/// Close (deregister) the service
pub async fn close_service(client: &CloudClient) -> Result<Option<String>> {
    tracing::info!("Closing workspace service in project {}", client.project_id);
    let response = client.delete(SERVICE, &service_path(client)?).await?;
    Ok(job_id(&response))
}

fn job_id(response: &Value) -> Option<String> {
    response
        .get("job_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Poll until the service reaches `target`. A closed service counts as
/// reached when `target` is `CLOSED`.
pub async fn wait_for_status(
    client: &CloudClient,
    target: &str,
    wait: WaitSettings,
) -> Result<Option<Value>> {
    poll_service(client, target, target, wait, |_| Ok(true)).await
}

/// Poll until the service is subscribed and no longer differs from `config`
pub async fn wait_for_config(
    client: &CloudClient,
    config: &ServiceConfig,
    wait: WaitSettings,
) -> Result<Value> {
    let settled = |record: &Value| -> Result<bool> {
        Ok(config.update_body(&service_row(record)?).is_none())
    };
    poll_service(client, STATUS_SUBSCRIBED, "configured", wait, settled)
        .await?
        .ok_or_else(|| Error::NotFound("workspace service".into()))
}

async fn poll_service<F>(
    client: &CloudClient,
    target: &str,
    goal: &str,
    wait: WaitSettings,
    mut settled: F,
) -> Result<Option<Value>>
where
    F: FnMut(&Value) -> Result<bool> + Send,
{
    for attempt in 1..=wait.attempts.max(1) {
        match read_service(client).await {
            Ok(record) => {
                let status = service_status(&record);
                if FAILED_STATUSES.contains(&status) {
                    return Err(Error::State(format!("workspace service status {}", status)));
                }
                if status == target && settled(&record)? {
                    return Ok(Some(record));
                }
                tracing::debug!(
                    "Workspace service is {} (attempt {}), waiting to be {}",
                    service_status(&record),
                    attempt,
                    goal
                );
            }
            Err(e) if e.is_not_found() && target == STATUS_CLOSED => return Ok(None),
            Err(e) => return Err(e),
        }
        tokio::time::sleep(wait.interval).await;
    }

    Err(Error::State(format!(
        "timed out waiting for workspace service to be {}",
        goal
    )))
}

/// Open or update the service until it matches `config`. Returns the
/// settled record.
pub async fn apply_service(
    client: &CloudClient,
    config: &ServiceConfig,
    wait: WaitSettings,
) -> Result<Value> {
    let record = match read_service(client).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            if let Some(job) = open_service(client, config).await? {
                tracing::debug!("Open job {}", job);
            }
            wait_for_status(client, STATUS_SUBSCRIBED, wait)
                .await?
                .ok_or_else(|| Error::NotFound("workspace service".into()))?
        }
        Err(e) => return Err(e),
    };

    // The open request has no access port; it goes through an update.
    if update_service(client, &service_row(&record)?, config).await? {
        return wait_for_config(client, config, wait).await;
    }
    Ok(record)
}

/// Close the service and wait for the tombstone. Returns false when it was
/// already closed.
pub async fn destroy_service(client: &CloudClient, wait: WaitSettings) -> Result<bool> {
    match read_service(client).await {
        Ok(_) => {
            if let Some(job) = close_service(client).await? {
                tracing::debug!("Close job {}", job);
            }
            wait_for_status(client, STATUS_CLOSED, wait).await?;
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            tracing::info!("Workspace service already closed");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
