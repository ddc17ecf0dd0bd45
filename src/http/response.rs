//! HTTP response building module
//!
//! Builders for the status codes the file server produces.

use super::range::ByteRange;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("304", &e, Bytes::new()))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_error_response(StatusCode::NOT_FOUND)
}

/// Build a plain-text error response such as `403 Forbidden`
pub fn build_error_response(status: StatusCode) -> Response<Full<Bytes>> {
    let text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from(text.clone())))
        .unwrap_or_else(|e| fallback(status.as_str(), &e, Bytes::from(text)))
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    let mut response = build_error_response(StatusCode::METHOD_NOT_ALLOWED);
    response.headers_mut().insert(
        hyper::header::ALLOW,
        hyper::header::HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    response
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("OPTIONS", &e, Bytes::new()))
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(total: usize) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Range", format!("bytes */{total}"))
        .body(Full::new(Bytes::from("416 Range Not Satisfiable")))
        .unwrap_or_else(|e| fallback("416", &e, Bytes::new()))
}

/// Build 200 response carrying a whole file
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    etag: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Accept-Ranges", "bytes");
    if let Some(etag) = etag {
        builder = builder.header("ETag", etag);
    }
    builder
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("200", &e, Bytes::new()))
}

/// Build 206 Partial Content response for one range of `data`
pub fn build_partial_response(
    data: &Bytes,
    range: ByteRange,
    content_type: &str,
    etag: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let body = if is_head {
        Bytes::new()
    } else {
        data.slice(range.start..=range.end)
    };

    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", content_type)
        .header("Content-Length", range.len())
        .header("Content-Range", range.content_range(data.len()))
        .header("Accept-Ranges", "bytes");
    if let Some(etag) = etag {
        builder = builder.header("ETag", etag);
    }
    builder
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("206", &e, Bytes::new()))
}

/// Log a response build error and return a bare response
fn fallback(status: &str, error: &hyper::http::Error, body: Bytes) -> Response<Full<Bytes>> {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
    Response::new(Full::new(body))
}
