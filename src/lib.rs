//! NetBox DNS - a host name directory derived from a NetBox database.
//!
//! This crate serves `GET /devices`, a JSON object mapping lowercase host names
//! to their IPv4 addresses, computed on every request from the NetBox IPAM
//! tables of one tenant group.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         netbox-dns                           │
//! │                                                              │
//! │  GET /devices ──▶ basic auth ──▶ handler                     │
//! │                                    │ one session per request │
//! │                                    ▼                         │
//! │  ┌──────────────────┐    ┌──────────────────┐                │
//! │  │ PgAddressSource  │───▶│ DirectoryBuilder │──▶ JSON        │
//! │  │ (NetBox schema)  │    │ 1. primaries     │                │
//! │  └──────────────────┘    │ 2. leases        │                │
//! │                          │ 3. secondaries   │                │
//! │                          └──────────────────┘                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Output
//!
//! ```json
//! {
//!   "printer": {"primary": "10.0.1.1"},
//!   "router1": {
//!     "primary": "10.0.0.5",
//!     "cnames": ["r1", "gw"],
//!     "secondary_ips": ["10.0.0.6"]
//!   }
//! }
//! ```
//!
//! Alternate names come from a `` `{"cnames": [...]}` `` line in the device
//! comment, see [`tag`].
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use netbox_dns::server::shutdown_signal;
//! use netbox_dns::{Config, DirectoryServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None).unwrap();
//!     let server = DirectoryServer::new(config);
//!     server.run(shutdown_signal()).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod netbox;
pub mod server;
pub mod source;
pub mod tag;
pub mod telemetry;

// Re-export main types
pub use crate::config::{
    BasicAuthConfig, Config, DatabaseConfig, HttpConfig, NetboxConfig, TelemetryConfig,
};
pub use crate::directory::{build_directory, Directory, DirectoryBuilder, DirectoryEntry};
pub use crate::error::DirectoryError;
pub use crate::server::{build_router, DirectoryServer};
pub use crate::source::{AddressSession, AddressSource, DeviceAddress, Lease};
