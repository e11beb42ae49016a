//! Relay driver: one origin fetch streamed back to one client.
//!
//! # Session lifecycle
//! ```text
//! Building ──fetch ok──▶ Sent ──headers copied──▶ HeadersResolved
//!     │                                                │ status committed
//!     │ setup error                                    ▼
//!     └──────────▶ (failed, error response)       Streaming ──▶ Done
//!                                                      └──────▶ Aborted
//! ```
//!
//! Once the status is committed nothing can turn into an error response:
//! a client that goes away or an origin read that fails ends the session
//! as `Aborted`. An origin read failure is pushed into the client body so
//! the transport tears the connection down instead of ending it cleanly.
//!
//! Every exit path drops the origin body, returns the copy buffer,
//! decrements the in-flight counter, records the streaming duration and
//! emits exactly one completion record.

use std::io;

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue, CONTENT_LENGTH};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode, Uri};
use axum::response::Response;
use bytes::Bytes;
use serde_json::{Map, Value};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::cookies::jar_from_request;
use crate::error::RelayError;
use crate::http::cache::{set_cache_control, set_canonical};
use crate::observability::logging::log_response;
use crate::observability::metrics::{record_session, InFlightGuard, StreamingSegment};
use crate::options::ProcessingOptions;
use crate::relay::fetch::{BodyReader, OriginResponse, OutboundRequest};
use crate::relay::headers::{copy_request_headers, copy_response_headers};
use crate::relay::metadata;
use crate::relay::RelayContext;

/// Chunks buffered between the copier and the client body.
const BODY_CHANNEL_CAPACITY: usize = 2;

/// Relay session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Building,
    Sent,
    HeadersResolved,
    Streaming,
    Done,
    Aborted,
}

/// Why a committed stream ended early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The client body was dropped (disconnect or transport cancellation).
    ClientGone,
    /// Reading the origin body failed.
    Upstream(String),
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::ClientGone => f.write_str("client disconnected"),
            AbortReason::Upstream(e) => write!(f, "origin read failed: {e}"),
        }
    }
}

/// Terminal result of a committed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Done { bytes: u64 },
    Aborted { bytes: u64, reason: AbortReason },
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Done { .. } => SessionState::Done,
            SessionOutcome::Aborted { .. } => SessionState::Aborted,
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            SessionOutcome::Done { bytes } | SessionOutcome::Aborted { bytes, .. } => *bytes,
        }
    }
}

/// Response with a committed status plus the task feeding its body.
#[derive(Debug)]
pub struct StreamingResponse {
    pub response: Response,
    /// Resolves when the body copy ends.
    pub session: JoinHandle<SessionOutcome>,
}

/// Bookkeeping for one relay call. Dropping it unfinished still logs.
struct Session {
    request_id: String,
    method: Method,
    uri: Uri,
    image_url: String,
    options: ProcessingOptions,
    state: SessionState,
    finished: bool,
    _segment: StreamingSegment,
    _in_flight: InFlightGuard,
}

impl Session {
    fn transition(&mut self, next: SessionState) {
        tracing::trace!(request_id = %self.request_id, from = ?self.state, to = ?next, "Session transition");
        self.state = next;
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("image_url".into(), Value::String(self.image_url.clone()));
        fields.insert(
            "processing_options".into(),
            serde_json::to_value(&self.options).unwrap_or(Value::Null),
        );
        fields
    }

    fn log(&mut self, status: StatusCode, error: Option<&str>, mut fields: Map<String, Value>) {
        self.finished = true;
        fields.extend(self.fields());
        fields.insert("state".into(), Value::String(format!("{:?}", self.state)));
        log_response(&self.request_id, &self.method, &self.uri, status, error, &fields);
    }

    /// Setup failed before the status was committed.
    fn fail(mut self, err: &RelayError) {
        record_session("failed");
        self.log(err.status(), Some(&err.to_string()), Map::new());
    }

    /// The body copy reached a terminal state.
    fn complete(mut self, status: StatusCode, outcome: &SessionOutcome) {
        self.transition(outcome.state());

        let mut fields = Map::new();
        fields.insert("bytes".into(), Value::from(outcome.bytes()));

        match outcome {
            SessionOutcome::Done { .. } => {
                record_session("done");
                self.log(status, None, fields);
            }
            SessionOutcome::Aborted { reason, .. } => {
                record_session("aborted");
                self.log(status, Some(&reason.to_string()), fields);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.finished {
            // Handler future dropped mid-setup (e.g. request timeout).
            record_session("failed");
            self.log(StatusCode::INTERNAL_SERVER_ERROR, Some("session cancelled"), Map::new());
        }
    }
}

/// Fetch `image_url` from its origin and stream it to the client.
///
/// Errors are returned only before the status is committed. The returned
/// response carries the origin status verbatim; its body is fed by a task
/// whose handle resolves to the session outcome.
pub async fn stream_origin_image(
    ctx: &RelayContext,
    config: &RelayConfig,
    request_id: &str,
    inbound: &Parts,
    options: ProcessingOptions,
    image_url: String,
) -> Result<StreamingResponse, RelayError> {
    let mut session = Session {
        request_id: request_id.to_string(),
        method: inbound.method.clone(),
        uri: inbound.uri.clone(),
        image_url,
        options,
        state: SessionState::Building,
        finished: false,
        _segment: StreamingSegment::start(),
        _in_flight: ctx.in_flight.track(),
    };

    let span = tracing::info_span!("streaming", request_id = %request_id);

    let origin = match fetch(ctx, config, inbound, &session.image_url)
        .instrument(span.clone())
        .await
    {
        Ok(origin) => origin,
        Err(e) => {
            session.fail(&e);
            return Err(e);
        }
    };
    session.transition(SessionState::Sent);

    let OriginResponse {
        status,
        headers: origin_headers,
        content_length,
        body,
    } = origin;

    let headers = response_headers(
        config,
        status,
        &origin_headers,
        content_length,
        &session.image_url,
        &session.options,
    );
    session.transition(SessionState::HeadersResolved);

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(BODY_CHANNEL_CAPACITY);

    let mut response = Response::new(Body::from_stream(ReceiverStream::new(rx)));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    let buffers = ctx.buffers.clone();
    let task = tokio::spawn(
        async move {
            session.transition(SessionState::Streaming);

            let mut buf = buffers.acquire();
            let outcome = copy_body(body, &mut buf, &tx).await;
            drop(buf);
            drop(tx);

            session.complete(status, &outcome);
            outcome
        }
        .instrument(span),
    );

    Ok(StreamingResponse {
        response,
        session: task,
    })
}

/// Build the outbound request and send it.
async fn fetch(
    ctx: &RelayContext,
    config: &RelayConfig,
    inbound: &Parts,
    image_url: &str,
) -> Result<OriginResponse, RelayError> {
    let headers = copy_request_headers(&inbound.headers);

    let cookie_jar = if config.cookies.passthrough {
        match jar_from_request(&inbound.headers, &inbound.uri, &config.cookies.base_url) {
            Ok(jar) => Some(jar),
            Err(e) => {
                tracing::warn!(error = %e, "Continuing without cookies");
                None
            }
        }
    } else {
        None
    };

    let request = OutboundRequest::build(image_url, headers, cookie_jar)?;
    tracing::debug!(url = %request.url, "Fetching origin");

    ctx.fetcher.send(request).await
}

/// Client response headers for an origin response.
fn response_headers(
    config: &RelayConfig,
    status: StatusCode,
    origin_headers: &HeaderMap,
    content_length: i64,
    image_url: &str,
    options: &ProcessingOptions,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    copy_response_headers(origin_headers, &mut headers);

    if content_length >= 0 {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    }

    if status.as_u16() < 300 {
        let image_type = metadata::resolve(&mut headers, image_url, options);
        tracing::debug!(image_type = %image_type, "Resolved content metadata");
    }

    set_cache_control(&mut headers, &config.cache);
    set_canonical(&mut headers, image_url, config.cache.set_canonical_header);

    headers
}

/// Copy the origin body into the client channel through `buf`.
async fn copy_body(
    mut body: BodyReader,
    buf: &mut [u8],
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> SessionOutcome {
    let mut bytes = 0u64;

    loop {
        let read = tokio::select! {
            read = body.read(buf) => read,
            _ = tx.closed() => {
                return SessionOutcome::Aborted { bytes, reason: AbortReason::ClientGone };
            }
        };

        let n = match read {
            Ok(0) => return SessionOutcome::Done { bytes },
            Ok(n) => n,
            Err(e) => {
                let reason = AbortReason::Upstream(e.to_string());
                let _ = tx.send(Err(e)).await;
                return SessionOutcome::Aborted { bytes, reason };
            }
        };

        if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
            return SessionOutcome::Aborted {
                bytes,
                reason: AbortReason::ClientGone,
            };
        }
        bytes += n as u64;
    }
}
