//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_images_in_progress` (gauge): relay sessions currently active
//! - `relay_streaming_duration_seconds` (histogram): session duration
//! - `relay_stream_sessions_total` (counter): finished sessions by outcome
//!
//! # Design Decisions
//! - Updates are side effects only; nothing reads them back on the hot path
//! - In-flight tracking is RAII so early returns still decrement
//! - The in-flight count is mirrored in an atomic so it can be read locally

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const IMAGES_IN_PROGRESS: &str = "relay_images_in_progress";
pub const STREAMING_DURATION: &str = "relay_streaming_duration_seconds";
pub const STREAM_SESSIONS: &str = "relay_stream_sessions_total";

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_gauge!(IMAGES_IN_PROGRESS, "Relay sessions currently streaming");
            describe_histogram!(
                STREAMING_DURATION,
                "Time from session start to the end of the body stream"
            );
            describe_counter!(STREAM_SESSIONS, "Finished relay sessions by outcome");
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Count one finished session. `outcome` is `done`, `aborted` or `failed`.
pub fn record_session(outcome: &'static str) {
    counter!(STREAM_SESSIONS, "outcome" => outcome).increment(1);
}

/// Count of active relay sessions, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct InFlightCounter {
    active: Arc<AtomicI64>,
}

impl InFlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active session. Returns a guard that decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        gauge!(IMAGES_IN_PROGRESS).increment(1.0);
        InFlightGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Current number of active sessions.
    pub fn current(&self) -> i64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Keeps one session counted as in flight.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<AtomicI64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        gauge!(IMAGES_IN_PROGRESS).decrement(1.0);
    }
}

/// Measures the streaming segment of a session. Recorded on drop.
#[derive(Debug)]
pub struct StreamingSegment {
    started: Instant,
}

impl StreamingSegment {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for StreamingSegment {
    fn drop(&mut self) {
        histogram!(STREAMING_DURATION).record(self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_counts() {
        let counter = InFlightCounter::new();
        assert_eq!(counter.current(), 0);

        let g1 = counter.track();
        let g2 = counter.clone().track();
        assert_eq!(counter.current(), 2);

        drop(g1);
        assert_eq!(counter.current(), 1);
        drop(g2);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn segment_measures_time() {
        let segment = StreamingSegment::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(segment.elapsed() >= Duration::from_millis(5));
    }
}
