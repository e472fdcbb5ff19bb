//! Metrics instrumentation for netbox-dns.
//!
//! All metrics are prefixed with `netbox_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a served `/devices` request.
pub fn record_request(result: RequestResult, duration: std::time::Duration) {
    let result_str = match result {
        RequestResult::Success => "success",
        RequestResult::Unauthorized => "unauthorized",
        RequestResult::Error => "error",
    };

    counter!("netbox_dns.request.count", "result" => result_str).increment(1);
    histogram!("netbox_dns.request.duration.seconds", "result" => result_str)
        .record(duration.as_secs_f64());
}

/// Request outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum RequestResult {
    /// Directory built and returned.
    Success,
    /// Rejected by the credential check.
    Unauthorized,
    /// Data source failure.
    Error,
}

/// Pipeline stage that consumed a result stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Device primary addresses.
    Primary,
    /// Non-device leases.
    Lease,
    /// Device secondary (interface) addresses.
    Secondary,
}

impl Stage {
    /// Label used in metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Primary => "primary",
            Stage::Lease => "lease",
            Stage::Secondary => "secondary",
        }
    }
}

/// Record how many rows a stage accepted and skipped.
pub fn record_stage_rows(stage: Stage, accepted: usize, skipped: usize) {
    counter!("netbox_dns.stage.rows.count", "stage" => stage.as_str(), "outcome" => "accepted")
        .increment(accepted as u64);
    counter!("netbox_dns.stage.rows.count", "stage" => stage.as_str(), "outcome" => "skipped")
        .increment(skipped as u64);
}

/// Record the size of the last built directory.
pub fn record_directory_counts(entries: usize, secondary_addresses: usize, cnames: usize) {
    gauge!("netbox_dns.directory.entries.count").set(entries as f64);
    gauge!("netbox_dns.directory.secondary_addresses.count").set(secondary_addresses as f64);
    gauge!("netbox_dns.directory.cnames.count").set(cnames as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
