//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! every section falls back to defaults, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CourierConfig {
    /// Logging settings.
    pub logging: LoggingConfig,

    /// Tuning for the shared transports.
    pub transport: TransportConfig,

    /// Defaults applied to requests built by the CLI.
    pub defaults: RequestDefaults,

    /// Named endpoints with templated URLs.
    pub api: ApiConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Tuning for both transport strategies.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransportConfig {
    pub standard: StandardTransportConfig,
    pub pooled: PooledTransportConfig,
}

/// Keep-alive pooled transport tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StandardTransportConfig {
    /// TCP connect timeout in seconds.
    pub dial_timeout_secs: u64,

    /// TCP keep-alive probe interval in seconds.
    pub keep_alive_secs: u64,

    /// Maximum idle connections kept per destination.
    pub max_idle_connections: usize,

    /// Idle connection expiry in seconds.
    pub idle_timeout_secs: u64,

    /// Overall per-request deadline in seconds.
    pub request_timeout_secs: u64,

    /// Route requests through proxies named by HTTP_PROXY/HTTPS_PROXY.
    pub use_env_proxy: bool,
}

impl Default for StandardTransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: 30,
            keep_alive_secs: 30,
            max_idle_connections: 100,
            idle_timeout_secs: 90,
            request_timeout_secs: 15,
            use_env_proxy: true,
        }
    }
}

impl StandardTransportConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// High-throughput pooled-object transport tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PooledTransportConfig {
    /// TCP connect timeout in seconds.
    pub dial_timeout_secs: u64,

    /// TCP keep-alive probe interval in seconds.
    pub keep_alive_secs: u64,

    /// Maximum concurrent connections per destination host.
    pub max_connections_per_host: usize,

    /// Idle connection expiry in seconds.
    pub idle_timeout_secs: u64,

    /// Deadline for each response body read in milliseconds.
    pub read_timeout_ms: u64,

    /// Deadline for acquiring a connection and sending the request, in milliseconds.
    pub write_timeout_ms: u64,

    /// Maximum number of idle response buffers kept for reuse.
    pub buffer_pool_capacity: usize,

    /// Buffers that grew beyond this many bytes are dropped instead of reused.
    pub max_retained_buffer_bytes: usize,
}

impl Default for PooledTransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: 30,
            keep_alive_secs: 30,
            max_connections_per_host: 50,
            idle_timeout_secs: 10,
            read_timeout_ms: 8_000,
            write_timeout_ms: 8_000,
            buffer_pool_capacity: 256,
            max_retained_buffer_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl PooledTransportConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Request defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RequestDefaults {
    /// User-Agent sent when none is given on the command line.
    pub user_agent: Option<String>,
}

/// Named endpoints.
///
/// ```toml
/// [api.urls]
/// base = "http://127.0.0.1:8000"
///
/// [[api.endpoints]]
/// id = "users"
/// name = "List users"
/// url = "{base}/users"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Placeholder values substituted into endpoint URLs.
    pub urls: HashMap<String, String>,

    /// Endpoint definitions.
    pub endpoints: Vec<ApiEndpoint>,
}

/// A single named endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ApiEndpoint {
    /// Unique identifier used for lookups.
    pub id: String,

    /// Human readable name.
    #[serde(default)]
    pub name: String,

    /// URL, possibly containing `{name}` placeholders.
    pub url: String,
}
