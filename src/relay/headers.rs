//! Header allow-lists for the passthrough path.
//!
//! # Responsibilities
//! - Define which inbound headers may reach the origin
//! - Define which origin headers may reach the client
//! - Copy headers across the boundary, nothing else
//!
//! # Design Decisions
//! - Allow-list only: a header not named here is never forwarded
//! - Request direction keeps the first value per key (keys unique)
//! - Response direction applies every origin value with set semantics,
//!   so the last value for a key wins

use axum::http::header::{
    HeaderMap, HeaderName, ACCEPT_ENCODING, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_ENCODING,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, EXPIRES, IF_NONE_MATCH, RANGE,
};

/// Inbound headers forwarded to the origin.
pub const STREAM_REQUEST_HEADERS: &[HeaderName] = &[IF_NONE_MATCH, ACCEPT_ENCODING, RANGE];

/// Origin headers forwarded to the client.
pub const STREAM_RESPONSE_HEADERS: &[HeaderName] = &[
    CACHE_CONTROL,
    EXPIRES,
    ETAG,
    CONTENT_TYPE,
    CONTENT_ENCODING,
    CONTENT_RANGE,
    ACCEPT_RANGES,
];

/// Build the outbound header map from the inbound request headers.
pub fn copy_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(STREAM_REQUEST_HEADERS.len());
    for name in STREAM_REQUEST_HEADERS {
        if let Some(value) = inbound.get(name) {
            if !value.is_empty() {
                outbound.insert(name.clone(), value.clone());
            }
        }
    }
    outbound
}

/// Copy allowed origin headers onto the client response headers.
pub fn copy_response_headers(origin: &HeaderMap, client: &mut HeaderMap) {
    for name in STREAM_RESPONSE_HEADERS {
        for value in origin.get_all(name) {
            client.insert(name.clone(), value.clone());
        }
    }
}
