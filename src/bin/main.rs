//! netbox-dns binary entry point.

use clap::Parser;
use netbox_dns::server::shutdown_signal;
use netbox_dns::{telemetry, Config, DirectoryServer};
use std::path::PathBuf;
use tracing::{error, info};

/// Publish a NetBox tenant group as a host name directory over HTTP.
#[derive(Parser, Debug)]
#[command(name = "netbox-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an optional configuration file (TOML). Environment variables
    /// override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = ?args.config,
        listen_addr = %config.http.listen_addr,
        tenant_group = %config.netbox.tenant_group_slug,
        "Starting netbox-dns"
    );

    let server = DirectoryServer::new(config);
    if let Err(e) = server.run(shutdown_signal()).await {
        error!("netbox-dns server error: {}", e);
        return Err(e.into());
    }

    info!("netbox-dns shutdown complete");
    Ok(())
}
