//! Data sources and resources
//!
//! Each module declares its endpoint, its static field table and a read
//! function taking an explicit [`CloudClient`](crate::cloud::CloudClient).
//!
//! - [`vpc_routes`] - `hcso_vpc_routes` data source
//! - [`vpc_subnets`] - `hcso_vpc_subnets` data source
//! - [`workspace_service`] - `hcso_workspace_service` resource

pub mod vpc_routes;
pub mod vpc_subnets;
pub mod workspace_service;

pub use vpc_routes::{read_vpc_routes, RoutesData, RoutesQuery};
pub use vpc_subnets::{read_vpc_subnets, SubnetsData, SubnetsQuery};
pub use workspace_service::{read_service, ServiceConfig};

/// Data sources have no natural ID; every read gets a fresh one
pub fn data_source_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
