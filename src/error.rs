//! Relay error types.
//!
//! Every variant here is raised before the response status is committed,
//! so it can still become a regular error response. Failures after that
//! point are session aborts, see [`crate::relay::stream::SessionOutcome`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The source URL could not be parsed or is not fetchable.
    #[error("invalid source URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The processing options in the request path are malformed.
    #[error("invalid processing options: {0}")]
    InvalidOptions(String),

    /// Cookie jar construction from the inbound request failed.
    #[error("can't build cookie jar: {0}")]
    CookieJar(String),

    /// The outbound request could not be constructed.
    #[error("can't build origin request: {0}")]
    BuildRequest(String),

    /// The origin could not be reached.
    #[error("origin request failed: {0}")]
    Send(String),

    /// The origin did not answer in time.
    #[error("origin request timed out: {0}")]
    Timeout(String),
}

impl RelayError {
    /// Status code of the error response sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidUrl { .. } | RelayError::InvalidOptions(_) => StatusCode::BAD_REQUEST,
            RelayError::CookieJar(_) | RelayError::BuildRequest(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Send(_) => StatusCode::BAD_GATEWAY,
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout(e.to_string())
        } else if e.is_builder() {
            RelayError::BuildRequest(e.to_string())
        } else {
            RelayError::Send(e.to_string())
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
