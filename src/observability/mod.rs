//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay sessions produce:
//!     → logging.rs (one structured completion record per request)
//!     → metrics.rs (in-flight gauge, duration histogram, outcome counter)
//!     → tracing spans (`streaming`) around each session
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows from the request layer into every record
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
