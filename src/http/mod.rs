//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → options.rs (relay path → processing options + source URL)
//!     → relay::stream (fetch origin, stream back)
//!     → cache.rs (cache policy, canonical link on the way out)
//!     → Send to client
//! ```

pub mod cache;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
