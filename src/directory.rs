//! Directory of host names and their IPv4 addresses.
//!
//! The directory is built from three result streams, strictly in this order:
//!
//! 1. device primary addresses, keyed by the lowercased device name and
//!    carrying the alternate names from the device comment,
//! 2. leases, named after their description, qualified with `.<tenant>`
//!    unless the tenant is the native one,
//! 3. device secondary addresses, appended to the entries of their device.
//!
//! An address claimed as a primary is never published again, and later stages
//! never replace an existing entry.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::config::NetboxConfig;
use crate::error::DirectoryError;
use crate::metrics::{self, Stage};
use crate::source::{AddressSession, DeviceAddress, Lease};
use crate::tag;

/// Addresses published for one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Address the name resolves to.
    pub primary: Ipv4Addr,

    /// Alternate names declared in the device comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnames: Option<Vec<String>>,

    /// Further addresses of the device, in discovery order.
    #[serde(rename = "secondary_ips", skip_serializing_if = "Vec::is_empty")]
    pub secondary_addresses: Vec<Ipv4Addr>,
}

impl DirectoryEntry {
    fn new(primary: Ipv4Addr) -> Self {
        Self {
            primary,
            cnames: None,
            secondary_addresses: Vec::new(),
        }
    }

    /// Append `address` unless it is already listed.
    fn add_secondary(&mut self, address: Ipv4Addr) -> bool {
        if self.secondary_addresses.contains(&address) {
            return false;
        }
        self.secondary_addresses.push(address);
        true
    }
}

/// Name to entry mapping, serialized with keys in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Directory {
    entries: BTreeMap<String, DirectoryEntry>,
}

impl Directory {
    /// Entry published under `name`.
    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.get(name)
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no name was published.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn emit_metrics(&self) {
        let secondaries: usize = self
            .entries
            .values()
            .map(|e| e.secondary_addresses.len())
            .sum();
        let cnames: usize = self
            .entries
            .values()
            .filter_map(|e| e.cnames.as_ref())
            .map(Vec::len)
            .sum();
        metrics::record_directory_counts(self.entries.len(), secondaries, cnames);
    }
}

/// Rows accepted and skipped by one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Rows that created or extended an entry.
    pub accepted: usize,
    /// Rows dropped by a precedence or duplicate check.
    pub skipped: usize,
}

impl StageStats {
    fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Incremental directory construction.
///
/// The stage methods must be called in order: [`primary_addresses`],
/// [`leases`], then [`secondary_addresses`].
///
/// [`primary_addresses`]: DirectoryBuilder::primary_addresses
/// [`leases`]: DirectoryBuilder::leases
/// [`secondary_addresses`]: DirectoryBuilder::secondary_addresses
#[derive(Debug, Default)]
pub struct DirectoryBuilder {
    native_tenant: Option<String>,
    entries: BTreeMap<String, DirectoryEntry>,
    /// Primary addresses of the current entries.
    claimed: HashSet<Ipv4Addr>,
}

impl DirectoryBuilder {
    /// Create a builder. Leases of `native_tenant` are not qualified.
    pub fn new(native_tenant: Option<String>) -> Self {
        Self {
            native_tenant,
            ..Default::default()
        }
    }

    /// Stage 1: one entry per device primary address.
    ///
    /// A device name seen twice (after lowercasing) keeps the last row.
    pub fn primary_addresses<I>(&mut self, rows: I) -> StageStats
    where
        I: IntoIterator<Item = DeviceAddress>,
    {
        let mut stats = StageStats::default();

        for row in rows {
            let name = row.device.to_lowercase();
            let mut entry = DirectoryEntry::new(row.address);
            entry.cnames = tag::extract_cnames(row.comments.as_deref());

            if let Some(previous) = self.entries.insert(name.clone(), entry) {
                warn!(
                    name = %name,
                    replaced = %previous.primary,
                    address = %row.address,
                    "device name registered twice, keeping the later address"
                );
            }
            stats.record(true);
        }

        // Overwritten entries no longer claim their address.
        self.claimed = self.entries.values().map(|e| e.primary).collect();
        stats
    }

    /// Stage 2: one entry per lease whose name and address are still free.
    pub fn leases<I>(&mut self, rows: I) -> StageStats
    where
        I: IntoIterator<Item = Lease>,
    {
        let mut stats = StageStats::default();

        for row in rows {
            let accepted = self.add_lease(row);
            stats.record(accepted);
        }

        stats
    }

    fn add_lease(&mut self, row: Lease) -> bool {
        if self.entries.contains_key(&row.description) {
            debug!(name = %row.description, "lease description already registered");
            return false;
        }
        if self.claimed.contains(&row.address) {
            debug!(address = %row.address, "lease address already claimed");
            return false;
        }

        let name = self.lease_name(&row);
        if self.entries.contains_key(&name) {
            debug!(name = %name, "lease name already registered");
            return false;
        }

        self.claimed.insert(row.address);
        self.entries.insert(name, DirectoryEntry::new(row.address));
        true
    }

    /// Lowercased lease name, qualified with the tenant unless it is native.
    fn lease_name(&self, row: &Lease) -> String {
        if self.native_tenant.as_deref() == Some(row.tenant.as_str()) {
            row.description.to_lowercase()
        } else {
            format!("{}.{}", row.description, row.tenant).to_lowercase()
        }
    }

    /// Stage 3: extra addresses for devices that already have an entry.
    ///
    /// The device name is matched exactly as delivered, so only devices whose
    /// name is already lowercase receive secondary addresses.
    pub fn secondary_addresses<I>(&mut self, rows: I) -> StageStats
    where
        I: IntoIterator<Item = DeviceAddress>,
    {
        let mut stats = StageStats::default();

        for row in rows {
            let accepted = if self.claimed.contains(&row.address) {
                false
            } else {
                match self.entries.get_mut(&row.device) {
                    Some(entry) => entry.add_secondary(row.address),
                    None => false,
                }
            };
            stats.record(accepted);
        }

        stats
    }

    /// Finish construction.
    pub fn build(self) -> Directory {
        Directory {
            entries: self.entries,
        }
    }
}

/// Run the three queries on `session` and build the directory.
pub async fn build_directory<S>(
    session: &mut S,
    netbox: &NetboxConfig,
) -> Result<Directory, DirectoryError>
where
    S: AddressSession + ?Sized,
{
    let group = netbox.tenant_group_slug.as_str();
    let mut builder = DirectoryBuilder::new(netbox.native_tenant.clone());

    let rows = session.primary_addresses(group).await?;
    let stats = builder.primary_addresses(rows);
    log_stage(Stage::Primary, stats);

    let rows = session.leases(group).await?;
    let stats = builder.leases(rows);
    log_stage(Stage::Lease, stats);

    let rows = session.secondary_addresses(group).await?;
    let stats = builder.secondary_addresses(rows);
    log_stage(Stage::Secondary, stats);

    let directory = builder.build();
    directory.emit_metrics();
    Ok(directory)
}

fn log_stage(stage: Stage, stats: StageStats) {
    debug!(
        stage = stage.as_str(),
        accepted = stats.accepted,
        skipped = stats.skipped,
        "stage complete"
    );
    metrics::record_stage_rows(stage, stats.accepted, stats.skipped);
}
