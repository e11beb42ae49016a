//! Image type tables.
//!
//! Lookup functions from MIME strings and file extensions to [`ImageType`],
//! plus Content-Disposition rendering for a resolved type.

use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

/// Filename used when neither an override nor the URL provides one.
const FILENAME_FALLBACK: &str = "image";

/// Known image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    Unknown,
    Jpeg,
    Jxl,
    Png,
    Webp,
    Gif,
    Ico,
    Svg,
    Heic,
    Avif,
    Bmp,
    Tiff,
}

impl ImageType {
    /// Resolve from a MIME string. Parameters (`; charset=...`) and case are ignored.
    pub fn by_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => ImageType::Jpeg,
            "image/jxl" => ImageType::Jxl,
            "image/png" => ImageType::Png,
            "image/webp" => ImageType::Webp,
            "image/gif" => ImageType::Gif,
            "image/x-icon" | "image/vnd.microsoft.icon" => ImageType::Ico,
            "image/svg+xml" => ImageType::Svg,
            "image/heif" | "image/heic" => ImageType::Heic,
            "image/avif" => ImageType::Avif,
            "image/bmp" | "image/x-ms-bmp" => ImageType::Bmp,
            "image/tiff" => ImageType::Tiff,
            _ => ImageType::Unknown,
        }
    }

    /// Resolve from a file extension without the leading dot.
    /// Matching is case-sensitive, like the extension table it mirrors.
    pub fn by_extension(ext: &str) -> Self {
        match ext {
            "jpeg" | "jpg" => ImageType::Jpeg,
            "jxl" => ImageType::Jxl,
            "png" => ImageType::Png,
            "webp" => ImageType::Webp,
            "gif" => ImageType::Gif,
            "ico" => ImageType::Ico,
            "svg" => ImageType::Svg,
            "heic" => ImageType::Heic,
            "avif" => ImageType::Avif,
            "bmp" => ImageType::Bmp,
            "tiff" => ImageType::Tiff,
            _ => ImageType::Unknown,
        }
    }

    /// Canonical MIME type, empty for `Unknown`.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageType::Unknown => "",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Jxl => "image/jxl",
            ImageType::Png => "image/png",
            ImageType::Webp => "image/webp",
            ImageType::Gif => "image/gif",
            ImageType::Ico => "image/x-icon",
            ImageType::Svg => "image/svg+xml",
            ImageType::Heic => "image/heif",
            ImageType::Avif => "image/avif",
            ImageType::Bmp => "image/bmp",
            ImageType::Tiff => "image/tiff",
        }
    }

    /// Canonical extension with a leading dot, empty for `Unknown`.
    pub fn ext(&self) -> &'static str {
        match self {
            ImageType::Unknown => "",
            ImageType::Jpeg => ".jpg",
            ImageType::Jxl => ".jxl",
            ImageType::Png => ".png",
            ImageType::Webp => ".webp",
            ImageType::Gif => ".gif",
            ImageType::Ico => ".ico",
            ImageType::Svg => ".svg",
            ImageType::Heic => ".heic",
            ImageType::Avif => ".avif",
            ImageType::Bmp => ".bmp",
            ImageType::Tiff => ".tiff",
        }
    }

    /// Render a Content-Disposition value for `filename` (without extension).
    pub fn content_disposition(&self, filename: &str, return_attachment: bool) -> String {
        let disposition = if return_attachment { "attachment" } else { "inline" };
        format!(
            "{}; filename=\"{}{}\"",
            disposition,
            filename.replace('"', "%22"),
            self.ext()
        )
    }

    /// Render a Content-Disposition value using the last path segment of
    /// `image_url`, stripped of its extension.
    pub fn content_disposition_from_url(&self, image_url: &str, return_attachment: bool) -> String {
        let filename = url_filename(image_url).map(|name| match path_extension(&name) {
            Some(ext) => name[..name.len() - ext.len() - 1].to_string(),
            None => name,
        });

        match filename {
            Some(name) if !name.is_empty() => self.content_disposition(&name, return_attachment),
            _ => self.content_disposition(FILENAME_FALLBACK, return_attachment),
        }
    }
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImageType::Unknown => "unknown",
            ImageType::Jpeg => "jpeg",
            ImageType::Jxl => "jxl",
            ImageType::Png => "png",
            ImageType::Webp => "webp",
            ImageType::Gif => "gif",
            ImageType::Ico => "ico",
            ImageType::Svg => "svg",
            ImageType::Heic => "heic",
            ImageType::Avif => "avif",
            ImageType::Bmp => "bmp",
            ImageType::Tiff => "tiff",
        };
        f.write_str(name)
    }
}

/// Extension of the last path segment, without the dot.
/// `None` when the segment has no dot or nothing follows it.
pub fn path_extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = segment.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

/// Last path segment of `image_url`, percent-decoded.
/// `None` for unparsable URLs and paths ending in `/`.
pub fn url_filename(image_url: &str) -> Option<String> {
    let url = Url::parse(image_url).ok()?;
    let segment = url.path().rsplit('/').next().unwrap_or("");
    let name = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    (!name.is_empty()).then_some(name)
}

/// MIME type for a file extension (without the dot), case-insensitive.
pub fn mime_by_extension(ext: &str) -> Option<&'static str> {
    mime_guess::from_ext(&ext.to_ascii_lowercase()).first_raw()
}
