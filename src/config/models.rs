// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_PING_INTERVAL_MINUTES: u64 = 10;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_PORT: u16 = 3000;

/// One year.
pub const MAX_PING_INTERVAL_MINUTES: u64 = 365 * 24 * 60;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Paths served by the read interface; the metrics path may not shadow them.
pub const RESERVED_PATHS: [&str; 2] = ["/health", "/ping"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target base URLs, probed in this order.
    pub endpoints: Vec<String>,

    #[serde(default = "default_ping_interval_minutes")]
    pub ping_interval_minutes: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Appended to every endpoint to build the probe URL. Empty probes the
    /// endpoint URL unchanged.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("invalid endpoint URL {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("ping_interval_minutes must be greater than zero")]
    ZeroInterval,

    #[error("ping_interval_minutes must be at most {max}, got {got}")]
    IntervalTooLarge { got: u64, max: u64 },

    #[error("probe_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("probe_timeout_secs must be at most {max}, got {got}")]
    TimeoutTooLarge { got: u64, max: u64 },

    #[error("invalid metrics path {0:?}")]
    InvalidMetricsPath(String),

    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        for endpoint in &self.endpoints {
            let url = probe_url(endpoint, &self.health_path).map_err(|e| {
                ConfigError::InvalidEndpoint {
                    url: endpoint.clone(),
                    reason: e.to_string(),
                }
            })?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidEndpoint {
                    url: endpoint.clone(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                });
            }
        }

        if self.ping_interval_minutes == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        if self.ping_interval_minutes > MAX_PING_INTERVAL_MINUTES {
            return Err(ConfigError::IntervalTooLarge {
                got: self.ping_interval_minutes,
                max: MAX_PING_INTERVAL_MINUTES,
            });
        }

        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.probe_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::TimeoutTooLarge {
                got: self.probe_timeout_secs,
                max: MAX_REQUEST_TIMEOUT_SECS,
            });
        }

        if self.metrics.enabled {
            let path = self.metrics.path.as_str();
            if !path.starts_with('/') || RESERVED_PATHS.contains(&path) {
                return Err(ConfigError::InvalidMetricsPath(path.to_string()));
            }
        }

        Ok(())
    }

    /// Apply the `PORT` override from the given value, if any.
    pub fn apply_port_override(&mut self, port: Option<String>) -> Result<(), ConfigError> {
        if let Some(raw) = port {
            self.server.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?;
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_minutes.saturating_mul(60))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Build the URL actually requested for `endpoint`.
pub fn probe_url(endpoint: &str, health_path: &str) -> Result<Url, url::ParseError> {
    if health_path.is_empty() {
        return Url::parse(endpoint);
    }

    let base = endpoint.trim_end_matches('/');
    let path = health_path.trim_start_matches('/');
    Url::parse(&format!("{}/{}", base, path))
}

fn default_ping_interval_minutes() -> u64 {
    DEFAULT_PING_INTERVAL_MINUTES
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
