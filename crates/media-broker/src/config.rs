//! Media Broker configuration.
//!
//! Configuration is loaded from environment variables and validated once,
//! before the routing core is constructed. An invalid worker pool is fatal:
//! the broker refuses to start rather than surfacing it per request.

use reqwest::Url;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8100";

/// Default timeout for a single worker request in seconds.
pub const DEFAULT_WORKER_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default timeout for establishing a worker connection in seconds.
pub const DEFAULT_WORKER_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Timeout for a whole inbound HTTP request in seconds.
///
/// Worker timeouts must stay below this so a slow worker surfaces as an
/// upstream failure rather than a request timeout.
pub const HTTP_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Media Broker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8100").
    pub bind_address: String,

    /// Ordered, non-empty list of worker base URLs.
    pub worker_endpoints: Vec<String>,

    /// Per-request timeout toward workers in seconds.
    pub worker_request_timeout_seconds: u64,

    /// Connect timeout toward workers in seconds.
    pub worker_connect_timeout_seconds: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Worker pool is empty: WORKER_ENDPOINTS must list at least one endpoint")]
    EmptyWorkerPool,

    #[error("Invalid worker endpoint: {0}")]
    InvalidWorkerEndpoint(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let raw_endpoints = vars
            .get("WORKER_ENDPOINTS")
            .ok_or_else(|| ConfigError::MissingEnvVar("WORKER_ENDPOINTS".to_string()))?;
        let worker_endpoints = parse_worker_endpoints(raw_endpoints)?;

        let worker_request_timeout_seconds = parse_timeout(
            vars,
            "WORKER_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_WORKER_REQUEST_TIMEOUT_SECONDS,
        )?;
        if worker_request_timeout_seconds >= HTTP_REQUEST_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidTimeout(format!(
                "WORKER_REQUEST_TIMEOUT_SECONDS must be less than {}, got {}",
                HTTP_REQUEST_TIMEOUT_SECONDS, worker_request_timeout_seconds
            )));
        }

        let worker_connect_timeout_seconds = parse_timeout(
            vars,
            "WORKER_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_WORKER_CONNECT_TIMEOUT_SECONDS,
        )?;

        Ok(Config {
            bind_address,
            worker_endpoints,
            worker_request_timeout_seconds,
            worker_connect_timeout_seconds,
        })
    }
}

/// Split a comma-separated endpoint list, preserving order.
///
/// Blank items are ignored; every remaining item must parse as an absolute
/// http(s) URL with a host. Trailing slashes are trimmed so paths can be
/// appended directly.
fn parse_worker_endpoints(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut endpoints = Vec::new();

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let url = Url::parse(item).map_err(|e| {
            ConfigError::InvalidWorkerEndpoint(format!("'{}' is not a valid URL: {}", item, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidWorkerEndpoint(format!(
                "'{}' must be an http:// or https:// URL with a host",
                item
            )));
        }

        endpoints.push(item.trim_end_matches('/').to_string());
    }

    if endpoints.is_empty() {
        return Err(ConfigError::EmptyWorkerPool);
    }

    Ok(endpoints)
}

fn parse_timeout(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidTimeout(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidTimeout(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}
