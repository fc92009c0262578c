//! Paginated read pipeline
//!
//! Builds a filtered query, follows marker pagination and flattens the
//! merged records into output rows.
//!
//! # Architecture
//!
//! - [`query`] - Query filters with empty-value removal
//! - [`pager`] - Marker pagination as a lazy page stream
//! - [`flatten`] - Static field tables mapping records to rows
//! - [`path`] - Dot-notation JSON lookup
//!
//! # Example
//!
//! ```ignore
//! let request = ListRequest::get("vpc", "/v2.0/vpc/routes")
//!     .query(QueryFilter::new().with("vpc_id", json!("v1")));
//! let pager = MarkerPager::new("routes", "id", "marker");
//! let rows = read_rows(&client, &request, &pager, &ROUTE_MAPPER).await?;
//! ```

pub mod flatten;
pub mod pager;
pub mod path;
pub mod query;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use flatten::{FieldKind, FieldRule, Row, RowMapper};
pub use pager::{CursorLocator, ListRequest, MarkerPager};
pub use query::QueryFilter;

/// Source of JSON pages, usually the cloud client
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, service: &str, path: &str, query: &[(String, String)]) -> Result<Value>;
}

/// Fetch all pages of a list request and flatten them into rows
pub async fn read_rows<T>(
    transport: &T,
    request: &ListRequest,
    pager: &MarkerPager,
    mapper: &RowMapper,
) -> Result<Vec<Row>>
where
    T: Transport + ?Sized,
{
    let records = pager.collect(transport, request).await?;
    mapper.map_all(&records)
}
