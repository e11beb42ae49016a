//! Cookie jar construction for cookie passthrough.
//!
//! Inbound cookies are scoped to a base URL: the configured cookie base URL,
//! or one derived from the inbound request. The jar then only yields them
//! for origin URLs that match that scope.

use std::sync::Arc;

use axum::http::header::{COOKIE, HOST};
use axum::http::{HeaderMap, Uri};
use reqwest::cookie::Jar;
use url::Url;

use crate::error::RelayError;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PORT: &str = "x-forwarded-port";

/// Build a cookie jar holding the inbound request's cookies.
///
/// Returns an empty jar when no base URL can be determined.
pub fn jar_from_request(
    headers: &HeaderMap,
    uri: &Uri,
    cookie_base_url: &str,
) -> Result<Arc<Jar>, RelayError> {
    let jar = Arc::new(Jar::default());

    let base = if cookie_base_url.is_empty() {
        match base_from_request(headers, uri) {
            Some(base) => base,
            None => return Ok(jar),
        }
    } else {
        Url::parse(cookie_base_url)
            .map_err(|e| RelayError::CookieJar(format!("can't parse cookie base URL: {e}")))?
    };

    for (name, value) in request_cookies(headers) {
        jar.add_cookie_str(&format!("{name}={value}"), &base);
    }

    Ok(jar)
}

fn base_from_request(headers: &HeaderMap, uri: &Uri) -> Option<Url> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    let scheme = header(X_FORWARDED_PROTO).unwrap_or("http");
    let mut host = header(X_FORWARDED_HOST)
        .or_else(|| header(HOST.as_str()))
        .or_else(|| uri.authority().map(|a| a.as_str()))?
        .to_string();

    if let Some(port) = header(X_FORWARDED_PORT) {
        host = format!("{host}:{port}");
    }

    Url::parse(&format!("{scheme}://{host}")).ok()
}

/// `name=value` pairs from every Cookie header, in order.
fn request_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use reqwest::cookie::CookieStore;

    fn cookie_header(jar: &Jar, url: &str) -> Option<String> {
        jar.cookies(&Url::parse(url).unwrap())
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn scopes_cookies_to_request_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("images.example.com"));
        headers.insert(COOKIE, HeaderValue::from_static("session=abc; theme=dark"));

        let jar = jar_from_request(&headers, &Uri::from_static("/plain/x"), "").unwrap();

        let sent = cookie_header(&jar, "http://images.example.com/cat.png").unwrap();
        assert!(sent.contains("session=abc"));
        assert!(sent.contains("theme=dark"));
        assert!(cookie_header(&jar, "http://other.example.org/cat.png").is_none());
    }

    #[test]
    fn forwarded_headers_take_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        headers.insert(X_FORWARDED_HOST, HeaderValue::from_static("public.example.com"));
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
        headers.insert(COOKIE, HeaderValue::from_static("a=1"));

        let jar = jar_from_request(&headers, &Uri::from_static("/"), "").unwrap();
        assert_eq!(
            cookie_header(&jar, "https://public.example.com/x.png").as_deref(),
            Some("a=1")
        );
        assert!(cookie_header(&jar, "http://internal/x.png").is_none());
    }

    #[test]
    fn configured_base_url() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token=t"));

        let jar = jar_from_request(&headers, &Uri::from_static("/"), "https://origin.example.com").unwrap();
        assert_eq!(
            cookie_header(&jar, "https://origin.example.com/a.jpg").as_deref(),
            Some("token=t")
        );
    }

    #[test]
    fn bad_base_url_is_an_error() {
        let err = jar_from_request(&HeaderMap::new(), &Uri::from_static("/"), "::not a url::").unwrap_err();
        assert!(matches!(err, RelayError::CookieJar(_)));
    }

    #[test]
    fn no_host_gives_empty_jar() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1"));

        let jar = jar_from_request(&headers, &Uri::from_static("/"), "").unwrap();
        assert!(cookie_header(&jar, "http://localhost/a.png").is_none());
    }
}
