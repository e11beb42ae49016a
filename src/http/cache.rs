//! Cache and canonical response headers.
//!
//! # Responsibilities
//! - Normalize Cache-Control/Expires according to the cache policy
//! - Set the canonical `Link` header pointing at the source URL
//!
//! # Design Decisions
//! - Origin cache headers survive only when passthrough is enabled
//! - Without usable origin values the configured TTL applies
//! - Both setters see headers already copied from the origin

use axum::http::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, LINK};
use chrono::{TimeDelta, Utc};

use crate::config::CacheConfig;

/// IMF-fixdate format used by HTTP date headers.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Apply the cache policy to `headers`, which may already hold origin values.
pub fn set_cache_control(headers: &mut HeaderMap, policy: &CacheConfig) {
    let has_value = |v: Option<&HeaderValue>| v.is_some_and(|v| !v.is_empty());
    let origin_present = has_value(headers.get(CACHE_CONTROL)) || has_value(headers.get(EXPIRES));

    if policy.passthrough && origin_present {
        if headers.get(CACHE_CONTROL).is_some_and(|v| v.is_empty()) {
            headers.remove(CACHE_CONTROL);
        }
        if headers.get(EXPIRES).is_some_and(|v| v.is_empty()) {
            headers.remove(EXPIRES);
        }
        return;
    }

    headers.remove(CACHE_CONTROL);
    headers.remove(EXPIRES);

    if policy.ttl_secs == 0 {
        return;
    }

    if let Ok(value) = HeaderValue::from_str(&format!("max-age={}, public", policy.ttl_secs)) {
        headers.insert(CACHE_CONTROL, value);
    }
    if let Some(expires) = expires_after(policy.ttl_secs) {
        headers.insert(EXPIRES, expires);
    }
}

fn expires_after(ttl_secs: u64) -> Option<HeaderValue> {
    let delta = TimeDelta::try_seconds(i64::try_from(ttl_secs).ok()?)?;
    let at = Utc::now().checked_add_signed(delta)?;
    HeaderValue::from_str(&at.format(HTTP_DATE_FORMAT).to_string()).ok()
}

/// Set `Link: <url>; rel="canonical"` for absolute http(s) URLs when enabled.
pub fn set_canonical(headers: &mut HeaderMap, image_url: &str, enabled: bool) {
    if !enabled {
        return;
    }
    if !(image_url.starts_with("https://") || image_url.starts_with("http://")) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&format!("<{image_url}>; rel=\"canonical\"")) {
        headers.insert(LINK, value);
    }
}
