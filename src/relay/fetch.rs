//! Outbound request construction and origin transport.
//!
//! # Responsibilities
//! - Validate the source URL and assemble the outbound request
//! - Attach cookies from a shared jar when passthrough is on
//! - Send exactly one request and expose the response as a byte reader
//!
//! # Design Decisions
//! - Transport is behind [`OriginFetcher`] so the relay can be driven by
//!   any client; [`ReqwestFetcher`] is the production one
//! - Bodies are forwarded undecoded: no transparent decompression
//! - No retries here; one call, one request

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::{HeaderMap, HeaderValue, COOKIE};
use axum::http::StatusCode;
use futures_util::TryStreamExt;
use reqwest::cookie::{CookieStore, Jar};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::config::DownloadConfig;
use crate::error::RelayError;

/// Origin body as an async byte reader.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

/// A request to an origin, ready to send.
#[derive(Debug)]
pub struct OutboundRequest {
    pub url: Url,
    /// Allow-listed headers only.
    pub headers: HeaderMap,
    /// Shared, read-only jar built from the inbound request.
    pub cookie_jar: Option<Arc<Jar>>,
}

impl OutboundRequest {
    /// Validate `image_url` and assemble the request.
    pub fn build(
        image_url: &str,
        headers: HeaderMap,
        cookie_jar: Option<Arc<Jar>>,
    ) -> Result<Self, RelayError> {
        let url = Url::parse(image_url).map_err(|e| RelayError::InvalidUrl {
            url: image_url.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RelayError::InvalidUrl {
                url: image_url.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        Ok(Self {
            url,
            headers,
            cookie_jar,
        })
    }

    /// Cookie header the jar yields for this request's URL.
    pub fn cookie_header(&self) -> Option<HeaderValue> {
        self.cookie_jar.as_ref().and_then(|jar| jar.cookies(&self.url))
    }
}

/// A response from an origin. The body is closed when this is dropped.
pub struct OriginResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Declared body length, `-1` when unknown.
    pub content_length: i64,
    pub body: BodyReader,
}

impl std::fmt::Debug for OriginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Sends outbound requests to origins.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<OriginResponse, RelayError>;
}

/// [`OriginFetcher`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build the client from the download settings.
    pub fn new(config: &DownloadConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| RelayError::BuildRequest(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetcher for ReqwestFetcher {
    async fn send(&self, request: OutboundRequest) -> Result<OriginResponse, RelayError> {
        let cookie = request.cookie_header();

        let mut builder = self.client.get(request.url).headers(request.headers);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_length = response
            .content_length()
            .and_then(|len| i64::try_from(len).ok())
            .unwrap_or(-1);

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let body: BodyReader = Box::pin(StreamReader::new(stream));

        Ok(OriginResponse {
            status,
            headers,
            content_length,
            body,
        })
    }
}
