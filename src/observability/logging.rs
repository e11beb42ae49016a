//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Emit the per-request completion record
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use axum::http::{Method, StatusCode, Uri};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Safe to call once per process.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("origin_relay={0},tower_http={0}", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

/// Log the outcome of a request.
///
/// `fields` is rendered as one JSON object so arbitrary keys survive
/// structured sinks. Level follows the status: error for 5xx or any error,
/// warn for 4xx, info otherwise.
pub fn log_response(
    request_id: &str,
    method: &Method,
    uri: &Uri,
    status: StatusCode,
    error: Option<&str>,
    fields: &Map<String, Value>,
) {
    let fields = Value::Object(fields.clone());

    if error.is_some() || status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            error = error.unwrap_or(""),
            fields = %fields,
            "Completed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            fields = %fields,
            "Completed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            fields = %fields,
            "Completed"
        );
    }
}
