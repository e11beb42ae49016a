//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs parse
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("server.path_prefix {0:?} must start with '/' and must not end with '/'")]
    PathPrefix(String),

    #[error("server.base_url {0:?} is not an absolute URL")]
    BaseUrl(String),

    #[error("server.request_timeout_secs must be greater than 0")]
    RequestTimeout,

    #[error("download.connect_timeout_secs must be greater than 0")]
    ConnectTimeout,

    #[error("cookies.base_url {0:?} is not an absolute URL")]
    CookieBaseUrl(String),

    #[error("observability.log_format {0:?} must be \"pretty\" or \"json\"")]
    LogFormat(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let prefix = &config.server.path_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::PathPrefix(prefix.clone()));
    }

    if !config.server.base_url.is_empty() && Url::parse(&config.server.base_url).is_err() {
        errors.push(ValidationError::BaseUrl(config.server.base_url.clone()));
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if config.download.connect_timeout_secs == 0 {
        errors.push(ValidationError::ConnectTimeout);
    }

    if !config.cookies.base_url.is_empty() && Url::parse(&config.cookies.base_url).is_err() {
        errors.push(ValidationError::CookieBaseUrl(config.cookies.base_url.clone()));
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::LogFormat(format.to_string()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
