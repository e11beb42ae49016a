//! Origin-stream relay library.
//!
//! Fetches a source image from its origin and streams the bytes back to
//! the client unmodified, with filtered headers, resolved content metadata
//! and a configured cache policy.

pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod imagetype;
pub mod lifecycle;
pub mod observability;
pub mod options;
pub mod relay;

pub use config::RelayConfig;
pub use error::RelayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
