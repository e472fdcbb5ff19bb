//! HTTP server setup and lifecycle management.

use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::require_basic_auth;
use crate::config::{BasicAuthConfig, Config, NetboxConfig};
use crate::directory::{build_directory, Directory};
use crate::error::DirectoryError;
use crate::metrics::{self, RequestResult, Timer};
use crate::netbox::PgAddressSource;
use crate::source::{AddressSession, AddressSource};

/// Shared state of the `/devices` handler.
pub struct AppState<S> {
    source: Arc<S>,
    netbox: Arc<NetboxConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            netbox: Arc::clone(&self.netbox),
        }
    }
}

/// Build the router: `GET /devices` behind basic authentication.
pub fn build_router<S: AddressSource>(
    source: Arc<S>,
    netbox: NetboxConfig,
    auth: BasicAuthConfig,
) -> Router {
    let state = AppState {
        source,
        netbox: Arc::new(netbox),
    };

    Router::new()
        .route("/devices", get(get_devices::<S>))
        .route_layer(middleware::from_fn_with_state(
            Arc::new(auth),
            require_basic_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the directory on a fresh session and return it as JSON.
async fn get_devices<S: AddressSource>(
    State(state): State<AppState<S>>,
) -> Result<Json<Directory>, DirectoryError> {
    let timer = Timer::start();
    let mut session = state.source.session();

    let result = build_directory(&mut session, &state.netbox).await;

    // Released on every path; a failed close does not fail a built directory.
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close data source session");
    }

    let elapsed = timer.elapsed();
    match result {
        Ok(directory) => {
            info!(
                entries = directory.len(),
                elapsed_seconds = elapsed.as_secs_f64(),
                "served directory"
            );
            metrics::record_request(RequestResult::Success, elapsed);
            Ok(Json(directory))
        }
        Err(e) => {
            metrics::record_request(RequestResult::Error, elapsed);
            Err(e)
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// HTTP server publishing the NetBox directory.
pub struct DirectoryServer {
    config: Config,
}

impl DirectoryServer {
    /// Create a new server with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> Result<(), DirectoryError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Config {
            http,
            database,
            netbox,
            ..
        } = self.config;

        info!(
            listen_addr = %http.listen_addr,
            database_host = %database.host,
            database_name = %database.name,
            tenant_group = %netbox.tenant_group_slug,
            "Starting netbox-dns server"
        );

        let source = Arc::new(PgAddressSource::new(&database));
        let app = build_router(source, netbox, http.auth);

        let listener = TcpListener::bind(http.listen_addr).await?;
        info!(addr = %http.listen_addr, "HTTP listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
