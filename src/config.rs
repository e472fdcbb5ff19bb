//! Configuration types for netbox-dns.
//!
//! Values are layered, later sources winning:
//!
//! 1. an optional TOML file,
//! 2. `NETBOX_DNS__<SECTION>__<KEY>` environment variables,
//! 3. the flat variable names of existing deployments (`DB_HOST`,
//!    `NETBOX_TENANTGROUP_SLUG`, ...), see [`LEGACY_ENV`].

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::DirectoryError;

/// Flat environment variables and the config key each one sets.
pub const LEGACY_ENV: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("NETBOX_TENANTGROUP_SLUG", "netbox.tenant_group_slug"),
    ("DNS_NATIVE_TENANT", "netbox.native_tenant"),
    ("BASIC_AUTH_USERNAME", "http.auth.username"),
    ("BASIC_AUTH_PASSWORD", "http.auth.password"),
    ("BASIC_AUTH_REALM", "http.auth.realm"),
];

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener and credentials.
    pub http: HttpConfig,

    /// NetBox database connection.
    pub database: DatabaseConfig,

    /// Which part of NetBox to publish.
    pub netbox: NetboxConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, DirectoryError> {
        let config = Self::load_with(path, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Like [`Config::load`], resolving legacy variables through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("NETBOX_DNS")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, lookup(var))?;
        }

        builder.build()?.try_deserialize()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Credentials required on every request.
    pub auth: BasicAuthConfig,
}

/// HTTP basic authentication credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    /// Expected user name.
    pub username: String,

    /// Expected password.
    pub password: String,

    /// Realm announced in the `WWW-Authenticate` challenge.
    #[serde(default)]
    pub realm: String,
}

impl std::fmt::Debug for BasicAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .finish()
    }
}

/// PostgreSQL connection settings for the NetBox database.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host name or address.
    pub host: String,

    /// Database port.
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database name.
    pub name: String,

    /// Database user.
    pub user: String,

    /// Database password.
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Scope of the published directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetboxConfig {
    /// Only addresses of tenants in this tenant group are published.
    pub tenant_group_slug: String,

    /// Leases of this tenant are published without a `.<tenant>` suffix.
    /// When unset, every lease name is qualified.
    #[serde(default)]
    pub native_tenant: Option<String>,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "netbox_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_db_port() -> u16 {
    5432
}
