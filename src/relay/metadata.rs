//! Content metadata resolution for successful origin responses.
//!
//! Order of precedence:
//! 1. An origin `Content-Type` decides the image type and is never replaced.
//! 2. Otherwise the URL path extension decides the image type and, through
//!    the MIME table, the `Content-Type`.
//! 3. `Content-Disposition` comes from the filename override when given,
//!    else from the URL.

use axum::http::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::imagetype::{mime_by_extension, path_extension, url_filename, ImageType};
use crate::options::ProcessingOptions;

/// Resolve the image type and set `Content-Type`/`Content-Disposition` on
/// the client headers. Lookup misses leave headers untouched.
pub fn resolve(headers: &mut HeaderMap, image_url: &str, options: &ProcessingOptions) -> ImageType {
    // Presence is decided on raw bytes; a value that is not visible ASCII
    // still counts and only yields an unknown type.
    let image_type = match headers.get(CONTENT_TYPE).filter(|v| !v.is_empty()) {
        Some(value) => value.to_str().map(ImageType::by_mime).unwrap_or_default(),
        None => from_url_extension(headers, image_url),
    };

    let disposition = match options.filename.as_deref() {
        Some(filename) if !filename.is_empty() => {
            image_type.content_disposition(filename, options.return_attachment)
        }
        _ => image_type.content_disposition_from_url(image_url, options.return_attachment),
    };

    if let Ok(value) = HeaderValue::from_bytes(disposition.as_bytes()) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    image_type
}

fn from_url_extension(headers: &mut HeaderMap, image_url: &str) -> ImageType {
    let Some(name) = url_filename(image_url) else {
        return ImageType::Unknown;
    };
    let Some(ext) = path_extension(&name) else {
        return ImageType::Unknown;
    };

    if let Some(mime) = mime_by_extension(ext) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    }

    ImageType::by_extension(ext)
}
