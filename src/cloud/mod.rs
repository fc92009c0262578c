//! Cloud API interaction module
//!
//! Authentication, the HTTP client and the main [`client::CloudClient`]
//! used by every data source and resource.
//!
//! # Module Structure
//!
//! - [`auth`] - IAM token and default region/project resolution
//! - [`client`] - Main client, endpoint resolution per service
//! - [`http`] - HTTP verbs and error mapping
//!
//! # Example
//!
//! ```ignore
//! use hcso_provider::{cloud::CloudClient, config::Config};
//!
//! async fn example() -> hcso_provider::Result<()> {
//!     let client = CloudClient::new(&Config::load())?;
//!     let body = client.get("vpc", "/v2.0/vpc/routes", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use auth::Credentials;
pub use client::CloudClient;
