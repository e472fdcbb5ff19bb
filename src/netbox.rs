//! PostgreSQL source reading the NetBox schema.

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{Connection, FromRow, PgConnection};
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::DirectoryError;
use crate::source::{AddressSession, AddressSource, DeviceAddress, Lease};

/// Active devices and their active primary IPv4 address.
const PRIMARY_ADDRESSES_SQL: &str = r#"
SELECT DISTINCT
    ipam_ipaddress.address AS address,
    dcim_device.name AS device,
    dcim_device.comments AS comments
FROM
    ipam_ipaddress
JOIN dcim_device ON ipam_ipaddress.id = dcim_device.primary_ip4_id
JOIN tenancy_tenant ON ipam_ipaddress.tenant_id = tenancy_tenant.id
JOIN tenancy_tenantgroup ON tenancy_tenant.group_id = tenancy_tenantgroup.id
WHERE
    bool(ipam_ipaddress.status) AND
    bool(dcim_device.status) AND
    ipam_ipaddress.family = 4 AND
    tenancy_tenantgroup.slug = $1
ORDER BY
    ipam_ipaddress.address ASC,
    dcim_device.name ASC
"#;

/// Active IPv4 addresses whose description is usable as a host name.
const LEASES_SQL: &str = r#"
SELECT DISTINCT
    ipam_ipaddress.address AS address,
    ipam_ipaddress.description AS description,
    tenancy_tenant.slug AS tenant
FROM
    ipam_ipaddress
JOIN tenancy_tenant ON ipam_ipaddress.tenant_id = tenancy_tenant.id
JOIN tenancy_tenantgroup ON tenancy_tenant.group_id = tenancy_tenantgroup.id
WHERE
    bool(ipam_ipaddress.status) AND
    ipam_ipaddress.family = 4 AND
    char_length(ipam_ipaddress.description) > 2 AND
    position(' ' in ipam_ipaddress.description) = 0 AND
    tenancy_tenantgroup.slug = $1
ORDER BY
    ipam_ipaddress.address ASC
"#;

/// Active interface addresses of active devices, excluding their primary.
const SECONDARY_ADDRESSES_SQL: &str = r#"
SELECT DISTINCT
    ipam_ipaddress.address AS address,
    dcim_device.name AS device,
    dcim_device.comments AS comments
FROM
    ipam_ipaddress
JOIN dcim_interface ON ipam_ipaddress.interface_id = dcim_interface.id
JOIN dcim_device ON dcim_interface.device_id = dcim_device.id
JOIN tenancy_tenant ON ipam_ipaddress.tenant_id = tenancy_tenant.id
JOIN tenancy_tenantgroup ON tenancy_tenant.group_id = tenancy_tenantgroup.id
WHERE
    bool(ipam_ipaddress.status) AND
    bool(dcim_device.status) AND
    ipam_ipaddress.family = 4 AND
    tenancy_tenantgroup.slug = $1 AND
    ipam_ipaddress.id != dcim_device.primary_ip4_id
ORDER BY
    ipam_ipaddress.address ASC,
    dcim_device.name ASC
"#;

#[derive(Debug, FromRow)]
struct DeviceAddressRow {
    address: IpNetwork,
    device: String,
    comments: Option<String>,
}

impl TryFrom<DeviceAddressRow> for DeviceAddress {
    type Error = DirectoryError;

    fn try_from(row: DeviceAddressRow) -> Result<Self, Self::Error> {
        Ok(DeviceAddress {
            address: host_v4(row.address)?,
            device: row.device,
            comments: row.comments,
        })
    }
}

#[derive(Debug, FromRow)]
struct LeaseRow {
    address: IpNetwork,
    description: String,
    tenant: String,
}

impl TryFrom<LeaseRow> for Lease {
    type Error = DirectoryError;

    fn try_from(row: LeaseRow) -> Result<Self, Self::Error> {
        Ok(Lease {
            address: host_v4(row.address)?,
            description: row.description,
            tenant: row.tenant,
        })
    }
}

/// Host part of an `inet` value; NetBox stores the prefix length alongside.
fn host_v4(network: IpNetwork) -> Result<Ipv4Addr, DirectoryError> {
    match network.ip() {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(v6) => Err(DirectoryError::InvalidAddress(v6.to_string())),
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, DirectoryError>
where
    T: TryFrom<R, Error = DirectoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Opens one lazily connected [`PgSession`] per request.
#[derive(Debug, Clone)]
pub struct PgAddressSource {
    options: PgConnectOptions,
}

impl PgAddressSource {
    /// Create a source for the given database settings.
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);

        Self { options }
    }
}

impl AddressSource for PgAddressSource {
    type Session = PgSession;

    fn session(&self) -> PgSession {
        PgSession {
            options: self.options.clone(),
            conn: None,
        }
    }
}

/// A single request's connection to the NetBox database.
///
/// The connection is opened by the first query. Dropping the session closes
/// it without the termination handshake; prefer [`AddressSession::close`].
pub struct PgSession {
    options: PgConnectOptions,
    conn: Option<PgConnection>,
}

impl PgSession {
    /// True once a query has opened the connection.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connection(&mut self) -> Result<&mut PgConnection, DirectoryError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                debug!(
                    host = self.options.get_host(),
                    port = self.options.get_port(),
                    "connecting to NetBox database"
                );
                PgConnection::connect_with(&self.options).await?
            }
        };
        Ok(self.conn.insert(conn))
    }
}

#[async_trait]
impl AddressSession for PgSession {
    async fn primary_addresses(
        &mut self,
        tenant_group: &str,
    ) -> Result<Vec<DeviceAddress>, DirectoryError> {
        let rows: Vec<DeviceAddressRow> = sqlx::query_as(PRIMARY_ADDRESSES_SQL)
            .bind(tenant_group)
            .fetch_all(self.connection().await?)
            .await?;
        convert(rows)
    }

    async fn leases(&mut self, tenant_group: &str) -> Result<Vec<Lease>, DirectoryError> {
        let rows: Vec<LeaseRow> = sqlx::query_as(LEASES_SQL)
            .bind(tenant_group)
            .fetch_all(self.connection().await?)
            .await?;
        convert(rows)
    }

    async fn secondary_addresses(
        &mut self,
        tenant_group: &str,
    ) -> Result<Vec<DeviceAddress>, DirectoryError> {
        let rows: Vec<DeviceAddressRow> = sqlx::query_as(SECONDARY_ADDRESSES_SQL)
            .bind(tenant_group)
            .fetch_all(self.connection().await?)
            .await?;
        convert(rows)
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("closed NetBox database connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_database_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "netbox-db.invalid".to_string(),
            port: 5432,
            name: "netbox".to_string(),
            user: "netbox".to_string(),
            password: "netbox".to_string(),
        }
    }

    #[test]
    fn test_host_v4_drops_prefix_length() {
        let network: IpNetwork = "10.0.0.5/24".parse().unwrap();
        assert_eq!(host_v4(network).unwrap(), Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_host_v4_rejects_ipv6() {
        let network: IpNetwork = "fd00::1/64".parse().unwrap();
        assert!(matches!(
            host_v4(network),
            Err(DirectoryError::InvalidAddress(addr)) if addr == "fd00::1"
        ));
    }

    #[test]
    fn test_lease_row_conversion() {
        let row = LeaseRow {
            address: "192.168.1.20/24".parse().unwrap(),
            description: "printer".to_string(),
            tenant: "corp".to_string(),
        };
        let lease = Lease::try_from(row).unwrap();
        assert_eq!(lease.address, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(lease.description, "printer");
    }

    #[test]
    fn test_session_does_not_connect_eagerly() {
        let source = PgAddressSource::new(&test_database_config());
        let session = source.session();
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_close_without_connection() {
        let source = PgAddressSource::new(&test_database_config());
        let mut session = source.session();
        assert!(session.close().await.is_ok());
    }
}
