//! VPC routes data source
//!
//! `GET /v2.0/vpc/routes`, filtered by type, VPC and destination, marker
//! paginated on the route ID.

use super::data_source_id;
use crate::cloud::CloudClient;
use crate::error::Result;
use crate::pipeline::query::opt_str;
use crate::pipeline::{read_rows, FieldRule, ListRequest, MarkerPager, QueryFilter, Row, RowMapper};
use serde::{Deserialize, Serialize};

pub const SERVICE: &str = "vpc";
pub const ROUTES_PATH: &str = "/v2.0/vpc/routes";

const ROUTE_FIELDS: &[FieldRule] = &[
    FieldRule::string("id", "id"),
    FieldRule::string("type", "type"),
    FieldRule::string("vpc_id", "vpc_id"),
    FieldRule::string("destination", "destination"),
    FieldRule::string("nexthop", "nexthop"),
];

pub const ROUTE_MAPPER: RowMapper = RowMapper::new(ROUTE_FIELDS);

/// Arguments of the data source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesQuery {
    /// Region to query; the client region when omitted
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "type")]
    pub route_type: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// Observed state of the data source
#[derive(Debug, Clone, Serialize)]
pub struct RoutesData {
    pub id: String,
    pub region: String,
    pub routes: Vec<Row>,
}

impl RoutesQuery {
    pub fn filter(&self) -> QueryFilter {
        QueryFilter::new()
            .with("type", opt_str(self.route_type.as_deref()))
            .with("vpc_id", opt_str(self.vpc_id.as_deref()))
            .with("destination", opt_str(self.destination.as_deref()))
    }

    pub fn request(&self) -> ListRequest {
        ListRequest::get(SERVICE, ROUTES_PATH).query(self.filter())
    }
}

pub fn routes_pager(max_pages: usize) -> MarkerPager {
    MarkerPager::new("routes", "id", "marker").max_pages(max_pages)
}

/// Read the data source
pub async fn read_vpc_routes(client: &CloudClient, query: &RoutesQuery) -> Result<RoutesData> {
    let client = match query.region.as_deref().filter(|r| !r.is_empty()) {
        Some(region) => client.for_region(region)?,
        None => client.clone(),
    };

    let routes = read_rows(
        &client,
        &query.request(),
        &routes_pager(client.max_pages()),
        &ROUTE_MAPPER,
    )
    .await?;

    tracing::info!("Read {} VPC routes in {}", routes.len(), client.region);

    Ok(RoutesData {
        id: data_source_id(),
        region: client.region.clone(),
        routes,
    })
}
