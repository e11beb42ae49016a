//! Origin-stream relay subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request + source URL + processing options
//!     → headers.rs (inbound allow-list)
//!     → fetch.rs (outbound request, one send)
//!     → headers.rs (response allow-list)
//!     → metadata.rs (Content-Type / Content-Disposition, status < 300)
//!     → http/cache.rs (cache policy, canonical link)
//!     → stream.rs (status committed, body copied via buffer_pool.rs)
//! ```
//!
//! # Design Decisions
//! - Bytes are forwarded unmodified; nothing is decoded
//! - Shared state is limited to the buffer pool and the in-flight counter
//! - No retries: a failed fetch fails the request

pub mod buffer_pool;
pub mod fetch;
pub mod headers;
pub mod metadata;
pub mod stream;

use std::sync::Arc;

use crate::config::DownloadConfig;
use crate::error::RelayError;
use crate::observability::metrics::InFlightCounter;
use buffer_pool::BufferPool;
use fetch::{OriginFetcher, ReqwestFetcher};

pub use stream::{stream_origin_image, SessionOutcome, SessionState, StreamingResponse};

/// Collaborators shared by every relay session.
#[derive(Clone)]
pub struct RelayContext {
    pub fetcher: Arc<dyn OriginFetcher>,
    pub buffers: Arc<BufferPool>,
    pub in_flight: InFlightCounter,
}

impl RelayContext {
    /// Production context: reqwest transport and the process-wide pool.
    pub fn from_config(config: &DownloadConfig) -> Result<Self, RelayError> {
        Ok(Self {
            fetcher: Arc::new(ReqwestFetcher::new(config)?),
            buffers: buffer_pool::global(),
            in_flight: InFlightCounter::new(),
        })
    }
}
