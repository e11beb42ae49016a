//! Processing options and relay path parsing.
//!
//! A relay path has the form
//! `/{option}/{option}/.../plain/{source-url}` where each option is a
//! `name:value` segment. The source URL is percent-decoded and appended to
//! the configured base URL.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Options that shape the passthrough response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Overrides the filename in Content-Disposition.
    pub filename: Option<String>,
    /// Send `attachment` instead of `inline`.
    pub return_attachment: bool,
}

/// Marker segment separating options from the source URL.
const PLAIN_MARKER: &str = "plain";

/// Split a relay path into processing options and the source URL.
///
/// `path` has the server prefix already stripped. `query` is the raw
/// inbound query string, re-attached to the source URL.
pub fn parse_path(
    path: &str,
    query: Option<&str>,
    base_url: &str,
) -> Result<(ProcessingOptions, String), RelayError> {
    let trimmed = path.trim_start_matches('/');
    let mut options = ProcessingOptions::default();

    let mut rest = trimmed;
    loop {
        let (segment, tail) = match rest.split_once('/') {
            Some((segment, tail)) => (segment, tail),
            None => (rest, ""),
        };

        if segment == PLAIN_MARKER {
            rest = tail;
            break;
        }
        if segment.is_empty() {
            return Err(RelayError::InvalidOptions(format!(
                "missing '/{PLAIN_MARKER}/' source marker in {path:?}"
            )));
        }

        apply_option(&mut options, segment)?;
        rest = tail;
    }

    if rest.is_empty() {
        return Err(RelayError::InvalidUrl {
            url: String::new(),
            reason: "empty source URL".to_string(),
        });
    }

    let decoded = percent_decode_str(rest).decode_utf8().map_err(|e| RelayError::InvalidUrl {
        url: rest.to_string(),
        reason: e.to_string(),
    })?;

    let mut image_url = format!("{base_url}{decoded}");
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        image_url.push(if image_url.contains('?') { '&' } else { '?' });
        image_url.push_str(q);
    }

    Ok((options, image_url))
}

fn apply_option(options: &mut ProcessingOptions, segment: &str) -> Result<(), RelayError> {
    let (name, value) = segment.split_once(':').ok_or_else(|| {
        RelayError::InvalidOptions(format!("option {segment:?} is not name:value"))
    })?;

    match name {
        "filename" | "fn" => {
            let decoded = percent_decode_str(value).decode_utf8_lossy().into_owned();
            options.filename = (!decoded.is_empty()).then_some(decoded);
        }
        "return_attachment" | "att" => {
            options.return_attachment = parse_bool(value).ok_or_else(|| {
                RelayError::InvalidOptions(format!("invalid boolean {value:?} for {name}"))
            })?;
        }
        _ => {
            return Err(RelayError::InvalidOptions(format!("unknown option {name:?}")));
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}
