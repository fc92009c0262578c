//! VPC subnets data source
//!
//! `GET /v1/{project_id}/subnets` with `limit`/`marker` pagination. The
//! API only filters by VPC; name, CIDR and status are matched on the
//! flattened rows.

use super::data_source_id;
use crate::cloud::CloudClient;
use crate::error::Result;
use crate::pipeline::query::opt_str;
use crate::pipeline::{read_rows, FieldRule, ListRequest, MarkerPager, QueryFilter, Row, RowMapper};
use serde::{Deserialize, Serialize};

pub const SERVICE: &str = "vpc";

/// Largest page the subnet API serves
const PAGE_SIZE: usize = 2000;

const SUBNET_FIELDS: &[FieldRule] = &[
    FieldRule::string("id", "id"),
    FieldRule::string("name", "name"),
    FieldRule::string("description", "description"),
    FieldRule::string("cidr", "cidr"),
    FieldRule::string("gateway_ip", "gateway_ip"),
    FieldRule::string("vpc_id", "vpc_id"),
    FieldRule::string("status", "status"),
    FieldRule::string("availability_zone", "availability_zone"),
    FieldRule::bool("dhcp_enable", "dhcp_enable"),
    FieldRule::string("primary_dns", "primary_dns"),
    FieldRule::string("secondary_dns", "secondary_dns"),
    FieldRule::string_list("dns_list", "dnsList"),
    FieldRule::bool("ipv6_enable", "ipv6_enable"),
    FieldRule::string("ipv6_cidr", "cidr_v6"),
    FieldRule::string("ipv6_gateway", "gateway_ip_v6"),
    FieldRule::string("ipv4_subnet_id", "neutron_subnet_id"),
    FieldRule::string("ipv6_subnet_id", "neutron_subnet_id_v6"),
];

pub const SUBNET_MAPPER: RowMapper = RowMapper::new(SUBNET_FIELDS);

/// Arguments of the data source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubnetsQuery {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Observed state of the data source
#[derive(Debug, Clone, Serialize)]
pub struct SubnetsData {
    pub id: String,
    pub region: String,
    pub subnets: Vec<Row>,
}

impl SubnetsQuery {
    pub fn filter(&self) -> QueryFilter {
        QueryFilter::new().with("vpc_id", opt_str(self.vpc_id.as_deref()))
    }

    pub fn request(&self, project_id: &str) -> ListRequest {
        ListRequest::get(SERVICE, &format!("/v1/{}/subnets", project_id)).query(self.filter())
    }

    /// Client-side match on the attributes the API cannot filter
    pub fn matches(&self, row: &Row) -> bool {
        let wanted = [
            ("name", &self.name),
            ("cidr", &self.cidr),
            ("status", &self.status),
        ];
        wanted.iter().all(|(key, value)| match value.as_deref() {
            None | Some("") => true,
            Some(v) => row.get(*key).and_then(|x| x.as_str()) == Some(v),
        })
    }
}

pub fn subnets_pager(max_pages: usize) -> MarkerPager {
    MarkerPager::new("subnets", "id", "marker")
        .page_size("limit", PAGE_SIZE)
        .max_pages(max_pages)
}

/// Read the data source
pub async fn read_vpc_subnets(client: &CloudClient, query: &SubnetsQuery) -> Result<SubnetsData> {
    let client = match query.region.as_deref().filter(|r| !r.is_empty()) {
        Some(region) => client.for_region(region)?,
        None => client.clone(),
    };
    let project_id = client.require_project()?;

    let subnets: Vec<Row> = read_rows(
        &client,
        &query.request(project_id),
        &subnets_pager(client.max_pages()),
        &SUBNET_MAPPER,
    )
    .await?
    .into_iter()
    .filter(|row| query.matches(row))
    .collect();

    tracing::info!("Read {} subnets in {}", subnets.len(), client.region);

    Ok(SubnetsData {
        id: data_source_id(),
        region: client.region.clone(),
        subnets,
    })
}
