//! Data-source seam between the directory builder and the database.
//!
//! A [`AddressSource`] is shared by the HTTP layer and hands out one
//! [`AddressSession`] per request. Sessions acquire their connection lazily on
//! the first query and release it in [`AddressSession::close`] or on drop.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::error::DirectoryError;

/// A device address row, from either the primary or the secondary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    /// Host part of the address.
    pub address: Ipv4Addr,
    /// Device name, as stored.
    pub device: String,
    /// Free-text device comment.
    pub comments: Option<String>,
}

/// An address held by a lease rather than a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Host part of the address.
    pub address: Ipv4Addr,
    /// Address description, used as the host name.
    pub description: String,
    /// Slug of the owning tenant.
    pub tenant: String,
}

/// One request's view of the data source.
///
/// Every query is restricted to active IPv4 addresses of tenants in
/// `tenant_group` and returns rows in ascending address order.
#[async_trait]
pub trait AddressSession: Send {
    /// Devices and their primary address, ordered by address then device name.
    async fn primary_addresses(
        &mut self,
        tenant_group: &str,
    ) -> Result<Vec<DeviceAddress>, DirectoryError>;

    /// Addresses with a usable description, ordered by address.
    async fn leases(&mut self, tenant_group: &str) -> Result<Vec<Lease>, DirectoryError>;

    /// Interface addresses other than the device's primary, ordered by address
    /// then device name.
    async fn secondary_addresses(
        &mut self,
        tenant_group: &str,
    ) -> Result<Vec<DeviceAddress>, DirectoryError>;

    /// Release the underlying connection, if one was opened.
    async fn close(&mut self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Factory for per-request sessions.
pub trait AddressSource: Send + Sync + 'static {
    /// Session type handed to each request.
    type Session: AddressSession;

    /// Open a session. No I/O happens until the first query.
    fn session(&self) -> Self::Session;
}
