//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request surface settings.
    pub server: ServerConfig,

    /// Outbound transport settings.
    pub download: DownloadConfig,

    /// Cookie passthrough settings.
    pub cookies: CookieConfig,

    /// Cache header policy.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Prefix stripped from every relay path (e.g. "/img"). Empty for none.
    pub path_prefix: String,

    /// Prepended to every source URL taken from a request path.
    pub base_url: String,

    /// Time allowed to produce response headers, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            path_prefix: String::new(),
            base_url: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Outbound (origin) transport configuration.
/// Applied when the server starts; not hot-reloaded.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    /// User-Agent sent to origins.
    pub user_agent: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum redirects followed per request.
    pub max_redirects: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("origin-relay/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 5,
            max_redirects: 10,
        }
    }
}

/// Cookie passthrough configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CookieConfig {
    /// Forward inbound cookies to origins matching the cookie base URL.
    pub passthrough: bool,

    /// URL the inbound cookies are scoped to. When empty, derived from the
    /// inbound request (X-Forwarded-* or Host).
    pub base_url: String,
}

/// Cache header policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep origin Cache-Control/Expires when present.
    pub passthrough: bool,

    /// TTL applied when origin headers are not kept. 0 disables.
    pub ttl_secs: u64,

    /// Add `Link: <source>; rel="canonical"` to responses.
    pub set_canonical_header: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            passthrough: false,
            ttl_secs: 31_536_000,
            set_canonical_header: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
