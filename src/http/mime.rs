//! MIME type detection module
//!
//! Returns the Content-Type for a served path based on its extension.

use std::path::Path;

/// Get MIME Content-Type for a file path
///
/// # Examples
/// ```
/// use embedserve::http::mime::content_type_for;
/// assert_eq!(content_type_for("/sub/index.html"), "text/html; charset=utf-8");
/// assert_eq!(content_type_for("a.TXT"), "text/plain; charset=utf-8");
/// assert_eq!(content_type_for("LICENSE"), "application/octet-stream");
/// ```
pub fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    get_content_type(extension.as_deref())
}

/// Get MIME Content-Type based on file extension (lowercase, no dot)
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("xml") => "text/xml; charset=utf-8",

        // Scripts and data
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",

        // Media
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents and archives
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("/static/app.js"), "text/javascript; charset=utf-8");
        assert_eq!(content_type_for("style.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("logo.png"), "image/png");
        assert_eq!(content_type_for("font.woff2"), "font/woff2");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type_for("data.xyz"), "application/octet-stream");
        assert_eq!(content_type_for("Makefile"), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
    }
}
