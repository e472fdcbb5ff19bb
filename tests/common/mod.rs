//! Shared test infrastructure for the `/devices` integration tests.

#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use tower::ServiceExt;

use netbox_dns::config::{BasicAuthConfig, NetboxConfig};
use netbox_dns::server::build_router;
use netbox_dns::source::{AddressSession, AddressSource, DeviceAddress, Lease};
use netbox_dns::DirectoryError;

// --- Constants ---

pub const TENANT_GROUP: &str = "campus";
pub const NATIVE_TENANT: &str = "corp";
pub const USERNAME: &str = "dns";
pub const PASSWORD: &str = "hunter2";

// --- In-memory source ---

/// Rows served by [`MemorySource`], in the order the queries would return them.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    pub primary: Vec<DeviceAddress>,
    pub leases: Vec<Lease>,
    pub secondary: Vec<DeviceAddress>,
}

/// Counters shared by every session of one source.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

/// Test double for the NetBox database.
pub struct MemorySource {
    rows: Rows,
    fail_on: Option<&'static str>,
    pub log: Arc<SessionLog>,
}

impl MemorySource {
    pub fn new(rows: Rows) -> Self {
        Self {
            rows,
            fail_on: None,
            log: Arc::new(SessionLog::default()),
        }
    }

    /// Make the named query (`primary`, `leases` or `secondary`) fail.
    pub fn failing_on(mut self, query: &'static str) -> Self {
        self.fail_on = Some(query);
        self
    }
}

impl AddressSource for MemorySource {
    type Session = MemorySession;

    fn session(&self) -> MemorySession {
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        MemorySession {
            rows: self.rows.clone(),
            fail_on: self.fail_on,
            log: Arc::clone(&self.log),
        }
    }
}

pub struct MemorySession {
    rows: Rows,
    fail_on: Option<&'static str>,
    log: Arc<SessionLog>,
}

impl MemorySession {
    fn query(&self, name: &'static str, tenant_group: &str) -> Result<(), DirectoryError> {
        assert_eq!(tenant_group, TENANT_GROUP);
        self.log.queries.lock().unwrap().push(name.to_string());
        if self.fail_on == Some(name) {
            return Err(DirectoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl AddressSession for MemorySession {
    async fn primary_addresses(
        &mut self,
        tenant_group: &str,
    ) -> Result<Vec<DeviceAddress>, DirectoryError> {
        self.query("primary", tenant_group)?;
        Ok(self.rows.primary.clone())
    }

    async fn leases(&mut self, tenant_group: &str) -> Result<Vec<Lease>, DirectoryError> {
        self.query("leases", tenant_group)?;
        Ok(self.rows.leases.clone())
    }

    async fn secondary_addresses(
        &mut self,
        tenant_group: &str,
    ) -> Result<Vec<DeviceAddress>, DirectoryError> {
        self.query("secondary", tenant_group)?;
        Ok(self.rows.secondary.clone())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// --- Row builders ---

pub fn device(address: &str, name: &str, comments: Option<&str>) -> DeviceAddress {
    DeviceAddress {
        address: address.parse::<Ipv4Addr>().unwrap(),
        device: name.to_string(),
        comments: comments.map(String::from),
    }
}

pub fn lease(address: &str, description: &str, tenant: &str) -> Lease {
    Lease {
        address: address.parse::<Ipv4Addr>().unwrap(),
        description: description.to_string(),
        tenant: tenant.to_string(),
    }
}

// --- Router construction ---

pub fn test_netbox_config() -> NetboxConfig {
    NetboxConfig {
        tenant_group_slug: TENANT_GROUP.to_string(),
        native_tenant: Some(NATIVE_TENANT.to_string()),
    }
}

pub fn test_auth_config() -> BasicAuthConfig {
    BasicAuthConfig {
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
        realm: "netbox".to_string(),
    }
}

pub fn build_test_router(source: Arc<MemorySource>) -> Router {
    build_router(source, test_netbox_config(), test_auth_config())
}

// --- Requests ---

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Send `GET uri` with an optional `Authorization` header.
pub async fn get(app: Router, uri: &str, authorization: Option<String>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }

    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

/// Authenticated `GET /devices`, parsed as JSON.
pub async fn get_devices(app: Router) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, "/devices", Some(basic_auth(USERNAME, PASSWORD))).await;
    let json = serde_json::from_slice(&body).unwrap_or_else(
        |_| serde_json::json!({ "raw": String::from_utf8_lossy(&body).to_string() }),
    );
    (status, json)
}
