//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Parse relay paths and hand them to the relay driver
//! - Apply configuration updates without restarting

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::observability::logging::log_response;
use crate::options::parse_path;
use crate::relay::{stream_origin_image, RelayContext};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<RelayConfig>>,
    pub relay: RelayContext,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server with the production transport.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let relay = RelayContext::from_config(&config.download)?;
        Ok(Self::with_context(config, relay))
    }

    /// Create a server around an existing relay context.
    pub fn with_context(config: RelayConfig, relay: RelayContext) -> Self {
        let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(config)),
            relay,
        };

        let router = Self::build_router(request_timeout, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/{*path}", any(relay_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, applying `config_updates`
    /// as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live_config = self.state.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                live_config.store(Arc::new(new_config));
                tracing::info!("Configuration reloaded");
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<RelayConfig> {
        self.state.config.load_full()
    }

    /// Relay collaborators, shared with the handlers.
    pub fn relay(&self) -> &RelayContext {
        &self.state.relay
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Passthrough handler: parse the relay path and stream the source.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let config = state.config.load_full();
    let (parts, _body) = request.into_parts();
    let request_id = parts.request_id();

    if parts.method != Method::GET && parts.method != Method::HEAD {
        return (StatusCode::METHOD_NOT_ALLOWED, "Only GET and HEAD are supported").into_response();
    }

    let prefix = config.server.path_prefix.as_str();
    let path = parts.uri.path();
    let rest = match path.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => {
            tracing::debug!(request_id = %request_id, path = %path, "Path outside relay prefix");
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }
    };

    let (options, image_url) = match parse_path(rest, parts.uri.query(), &config.server.base_url) {
        Ok(parsed) => parsed,
        Err(e) => {
            log_response(
                &request_id,
                &parts.method,
                &parts.uri,
                e.status(),
                Some(&e.to_string()),
                &serde_json::Map::new(),
            );
            return e.into_response();
        }
    };

    match stream_origin_image(&state.relay, &config, &request_id, &parts, options, image_url).await {
        Ok(streaming) => streaming.response,
        Err(e) => e.into_response(),
    }
}
