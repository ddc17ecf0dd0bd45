//! Static file transfer
//!
//! Turns one resolved store path into a response: content type, length,
//! conditional GET against the attached `ETag`, single byte ranges and
//! HEAD handling.

use crate::http::{self, cache, mime, RangeParseResult};
use crate::logger;
use crate::store::BackingStore;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use std::io;

/// Serve the file at `path` from `store`
///
/// `etag` is attached to every successful response and is the validator
/// for `If-None-Match` and `If-Range`.
pub fn serve_file<S>(
    store: &S,
    req: &Request<()>,
    path: &str,
    etag: Option<&str>,
) -> Response<Full<Bytes>>
where
    S: BackingStore + ?Sized,
{
    let data = match store.read_file(path) {
        Ok(data) => data,
        Err(e) => return error_response(path, &e),
    };

    let is_head = req.method() == Method::HEAD;
    let is_get_or_head = is_head || req.method() == Method::GET;

    if let Some(etag) = etag {
        if is_get_or_head && cache::check_etag_match(header(req, "if-none-match"), etag) {
            return http::build_304_response(etag);
        }
    }

    let content_type = mime::content_type_for(path);

    if is_get_or_head && cache::if_range_allows(header(req, "if-range"), etag) {
        match http::parse_range_header(header(req, "range"), data.len()) {
            RangeParseResult::Satisfiable(range) => {
                return http::response::build_partial_response(
                    &data,
                    range,
                    content_type,
                    etag,
                    is_head,
                );
            }
            RangeParseResult::NotSatisfiable => return http::build_416_response(data.len()),
            RangeParseResult::Ignored => {}
        }
    }

    http::response::build_file_response(data, content_type, etag, is_head)
}

fn header<'a>(req: &'a Request<()>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Map a store read failure onto a status code
fn error_response(path: &str, err: &io::Error) -> Response<Full<Bytes>> {
    let status = match err.kind() {
        io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        _ => {
            logger::log_error(&format!("Failed to read '{path}': {err}"));
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    http::build_error_response(status)
}
