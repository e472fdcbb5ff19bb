//! Error types for netbox-dns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors that can occur while building or serving the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// IO error (listener bind, socket, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Settings(#[from] config::ConfigError),

    /// The data source delivered an address that is not IPv4
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal server error" })),
        )
            .into_response()
    }
}
