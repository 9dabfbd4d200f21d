//! Reference HTTP host for an authentication unit.
//!
//! Loads its settings from environment variables and exposes the unit's
//! three operations over axum routes.
//!
//! # Environment Variables
//!
//! - `AUTH_SECRET`: token signing secret (required)
//! - `AUTH_STORE_PATH`: path of the JSON credential store (required)
//! - `AUTH_TOKEN_EXPIRATION_MINUTES`: token lifetime (default: `60`)
//! - `AUTH_USE_HTTP`: `true` to advertise insecure transport (default: `false`)
//! - `AUTH_PROVIDER_NAME`: provider name for descriptor and issuer (default: `auth`)
//! - `AUTH_LISTEN_PORT`: port to listen on (default: `3000`)
//!
//! # Routes
//!
//! - `GET|POST /authenticate` returns `{ token, expires }`
//! - `GET|POST /authorize` returns the decoded claims
//! - `GET /specification` returns the capability descriptor
//!
//! Failures are returned as `{ code, message }` with the matching status.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};

use crate::config::UnitOptions;
use crate::error::AuthError;
use crate::request::AuthRequest;
use crate::unit::AuthUnit;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Host configuration.
#[derive(Clone)]
pub struct HostConfig {
    /// Token signing secret.
    pub secret: String,
    /// Path of the JSON credential store.
    pub store_path: PathBuf,
    pub token_expiration_minutes: Option<u64>,
    pub use_http: Option<bool>,
    pub provider_name: Option<String>,
    /// Port to listen on.
    pub listen_port: u16,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("secret", &"<redacted>")
            .field("store_path", &self.store_path)
            .field("token_expiration_minutes", &self.token_expiration_minutes)
            .field("use_http", &self.use_http)
            .field("provider_name", &self.provider_name)
            .field("listen_port", &self.listen_port)
            .finish()
    }
}

/// Error returned when loading host configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for HostConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for HostConfigError {}

impl HostConfig {
    /// Default port for the host.
    pub const DEFAULT_PORT: u16 = 3000;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is unset or any value fails to parse.
    pub fn from_env() -> Result<Self, HostConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as `from_env`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HostConfigError> {
        let secret = required(&lookup, "AUTH_SECRET")?;
        let store_path = PathBuf::from(required(&lookup, "AUTH_STORE_PATH")?);
        let token_expiration_minutes = parsed(&lookup, "AUTH_TOKEN_EXPIRATION_MINUTES", "an integer")?;
        let use_http = parsed(&lookup, "AUTH_USE_HTTP", "'true' or 'false'")?;
        let provider_name = lookup("AUTH_PROVIDER_NAME");
        let listen_port = parsed(&lookup, "AUTH_LISTEN_PORT", "a valid port number (1-65535)")?
            .unwrap_or(Self::DEFAULT_PORT);

        Ok(Self {
            secret,
            store_path,
            token_expiration_minutes,
            use_http,
            provider_name,
            listen_port,
        })
    }

    /// Options bag for the unit this host serves.
    #[must_use]
    pub fn unit_options(&self) -> UnitOptions {
        let mut options = UnitOptions::default();
        if let Some(minutes) = self.token_expiration_minutes {
            options = options.with_token_expiration_minutes(minutes);
        }
        if let Some(use_http) = self.use_http {
            options = options.with_use_http(use_http);
        }
        if let Some(name) = &self.provider_name {
            options = options.with_provider_name(name.clone());
        }
        options
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, HostConfigError> {
    let value = lookup(name).ok_or_else(|| HostConfigError::MissingEnvVar(name.to_string()))?;
    if value.is_empty() {
        return Err(HostConfigError::InvalidValue {
            name: name.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    expected: &str,
) -> Result<Option<T>, HostConfigError> {
    lookup(name)
        .map(|value| {
            value.parse::<T>().map_err(|_| HostConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not {expected}"),
            })
        })
        .transpose()
}

/// Build the router serving `unit`.
#[must_use]
pub fn router(unit: Arc<AuthUnit>) -> Router {
    Router::new()
        .route("/authenticate", get(authenticate).post(authenticate))
        .route("/authorize", get(authorize).post(authorize))
        .route("/specification", get(specification))
        .with_state(unit)
}

/// Build an `AuthRequest` from raw HTTP parts.
///
/// A body sent as `application/x-www-form-urlencoded` is read as form fields;
/// any other body is read as a JSON object. Non-string JSON values and bodies
/// that are neither are ignored. Headers that are not valid UTF-8 are dropped.
#[must_use]
pub fn request_from_parts(
    query: HashMap<String, String>,
    headers: &HeaderMap,
    raw_body: &[u8],
) -> AuthRequest {
    let body = if is_form_encoded(headers) {
        Some(form_fields(raw_body))
    } else {
        json_fields(raw_body)
    };
    if body.is_none() && !raw_body.trim_ascii().is_empty() {
        tracing::debug!(
            "ignoring request body: not a JSON object or form ({} bytes)",
            raw_body.len()
        );
    }

    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    AuthRequest {
        query: Some(query),
        body,
        headers: Some(headers),
    }
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

fn form_fields(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

fn json_fields(body: &[u8]) -> Option<HashMap<String, String>> {
    let fields = serde_json::from_slice::<serde_json::Map<String, Value>>(body).ok()?;
    Some(
        fields
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect(),
    )
}

/// Convert an `AuthError` into an HTTP response.
#[must_use]
pub fn error_response(error: &AuthError) -> Response {
    let status = StatusCode::from_u16(error.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("request failed: {error}");
    }
    let body = json!({ "code": error.code(), "message": error.to_string() });
    (status, Json(body)).into_response()
}

async fn authenticate(
    State(unit): State<Arc<AuthUnit>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = request_from_parts(query, &headers, &body);
    match unit.authenticate(&request).await {
        Ok(issued) => Json(issued).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn authorize(
    State(unit): State<Arc<AuthUnit>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = request_from_parts(query, &headers, &body);
    match unit.authorize(&request).await {
        Ok(claims) => Json(claims).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn specification(State(unit): State<Arc<AuthUnit>>) -> Response {
    Json(unit.describe()).into_response()
}
