//! HTTP basic authentication middleware.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::BasicAuthConfig;
use crate::metrics::{self, RequestResult, Timer};

/// Credentials decoded from an `Authorization: Basic ...` header.
#[derive(Debug, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Decode a basic `Authorization` header value.
pub fn parse_basic_header(value: &str) -> Option<Credentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

impl BasicAuthConfig {
    /// True if `credentials` match the configured user and password.
    ///
    /// Both fields are always compared, in constant time per field length.
    pub fn accepts(&self, credentials: &Credentials) -> bool {
        let username = credentials.username.as_bytes().ct_eq(self.username.as_bytes());
        let password = credentials.password.as_bytes().ct_eq(self.password.as_bytes());
        (username & password).into()
    }

    fn challenge(&self) -> Response {
        let challenge = format!("Basic realm=\"{}\"", self.realm);
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Reject requests whose basic credentials do not match `auth`.
pub async fn require_basic_auth(
    State(auth): State<Arc<BasicAuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let timer = Timer::start();
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_header);

    match credentials {
        Some(credentials) if auth.accepts(&credentials) => next.run(request).await,
        Some(credentials) => {
            debug!(username = %credentials.username, "rejected credentials");
            metrics::record_request(RequestResult::Unauthorized, timer.elapsed());
            auth.challenge()
        }
        None => {
            debug!("missing or malformed Authorization header");
            metrics::record_request(RequestResult::Unauthorized, timer.elapsed());
            auth.challenge()
        }
    }
}
