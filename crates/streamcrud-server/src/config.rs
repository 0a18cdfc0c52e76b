//! Configuration for the mirror service.
//!
//! All configuration is loaded from environment variables. The service
//! needs to know where the remote collection lives and how to bind; the
//! sync and lookup tunables fall back to the core defaults.

use std::time::Duration;

use streamcrud_core::config::{DEFAULT_LOOKUP_BUDGET, DEFAULT_RETRIES};
use streamcrud_core::{EngineConfig, LookupConfig, UpdateVerb};

use crate::server::ServerConfig;

/// Default number of failure records kept for `GET /api/failures`.
const DEFAULT_FAILURE_LOG_CAPACITY: usize = 100;

/// Default lookup deadline in milliseconds.
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5000;

/// Default remote request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required env var {0}")]
    Missing(String),

    /// A variable is set but does not parse.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: String,
        /// Parse failure description.
        reason: String,
    },
}

/// Log line format for the service binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the backend (e.g. `http://localhost:9000`).
    pub remote_url: String,
    /// Collection path on the backend (e.g. `/api/books`).
    pub resource_path: String,
    /// Bind address.
    pub server: ServerConfig,
    /// Sync engine tunables.
    pub engine: EngineConfig,
    /// Lookup tunables.
    pub lookup: LookupConfig,
    /// Whether route ids are integers.
    pub id_is_integer: bool,
    /// Per-request timeout for remote calls.
    pub request_timeout: Duration,
    /// Load the full collection at startup.
    pub preload: bool,
    /// Failure records retained in memory.
    pub failure_log_capacity: usize,
    /// Log line format.
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `STREAMCRUD_REMOTE_URL` -- backend base URL
    ///
    /// Optional variables:
    /// - `STREAMCRUD_RESOURCE_PATH` -- collection path (default `items`)
    /// - `STREAMCRUD_HOST` / `STREAMCRUD_PORT` -- bind address (default `0.0.0.0:8080`)
    /// - `STREAMCRUD_RETRIES` -- extra attempts per remote call (default 2)
    /// - `STREAMCRUD_FETCH_ONE_BY_ID` -- single-item fetch by id path (default `false`)
    /// - `STREAMCRUD_UPDATE_VERB` -- `post` or `put` (default `post`)
    /// - `STREAMCRUD_LOOKUP_BUDGET` -- fetches per lookup (default 2)
    /// - `STREAMCRUD_LOOKUP_TIMEOUT_MS` -- lookup deadline, `0` disables (default 5000)
    /// - `STREAMCRUD_ID_IS_INTEGER` -- parse route ids as integers (default `true`)
    /// - `STREAMCRUD_REQUEST_TIMEOUT_MS` -- remote request timeout (default 10000)
    /// - `STREAMCRUD_PRELOAD` -- fetch the collection at startup (default `true`)
    /// - `STREAMCRUD_FAILURE_LOG` -- failure records retained (default 100)
    /// - `STREAMCRUD_LOG_FORMAT` -- `text` or `json` (default `text`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_source(source: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let remote_url = source("STREAMCRUD_REMOTE_URL")
            .ok_or_else(|| ConfigError::Missing("STREAMCRUD_REMOTE_URL".to_owned()))?;
        let resource_path =
            source("STREAMCRUD_RESOURCE_PATH").unwrap_or_else(|| "items".to_owned());

        let defaults = ServerConfig::default();
        let host = source("STREAMCRUD_HOST").unwrap_or(defaults.host);
        let port = parse_or(&source, "STREAMCRUD_PORT", defaults.port)?;

        let update_verb = match source("STREAMCRUD_UPDATE_VERB")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("post") => UpdateVerb::Post,
            Some("put") => UpdateVerb::Put,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STREAMCRUD_UPDATE_VERB".to_owned(),
                    reason: format!("unknown verb {other}"),
                });
            }
        };
        let engine = EngineConfig {
            retries: parse_or(&source, "STREAMCRUD_RETRIES", DEFAULT_RETRIES)?,
            fetch_one_by_id: parse_or(&source, "STREAMCRUD_FETCH_ONE_BY_ID", false)?,
            update_verb,
        };

        let timeout_ms: u64 = parse_or(
            &source,
            "STREAMCRUD_LOOKUP_TIMEOUT_MS",
            DEFAULT_LOOKUP_TIMEOUT_MS,
        )?;
        let lookup = LookupConfig {
            budget: parse_or(&source, "STREAMCRUD_LOOKUP_BUDGET", DEFAULT_LOOKUP_BUDGET)?,
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        };

        let log_format = match source("STREAMCRUD_LOG_FORMAT")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STREAMCRUD_LOG_FORMAT".to_owned(),
                    reason: format!("unknown format {other}"),
                });
            }
        };

        let request_timeout_ms: u64 = parse_or(
            &source,
            "STREAMCRUD_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;

        Ok(Self {
            remote_url,
            resource_path,
            server: ServerConfig { host, port },
            engine,
            lookup,
            id_is_integer: parse_or(&source, "STREAMCRUD_ID_IS_INTEGER", true)?,
            request_timeout: Duration::from_millis(request_timeout_ms),
            preload: parse_or(&source, "STREAMCRUD_PRELOAD", true)?,
            failure_log_capacity: parse_or(
                &source,
                "STREAMCRUD_FAILURE_LOG",
                DEFAULT_FAILURE_LOG_CAPACITY,
            )?,
            log_format,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(
    source: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match source(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_owned(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
