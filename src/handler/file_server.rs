//! File server request routing
//!
//! Strips the URL prefix, classifies the remaining path through the index
//! and either transfers a file, transfers a directory's `index.html`, or
//! calls the not-found handler.

use super::transfer;
use crate::embed_fs::EmbedFs;
use crate::http::{self, cache};
use crate::index;
use crate::store::BackingStore;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::uri::{PathAndQuery, Uri};
use hyper::{Request, Response};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::future::{ready, Ready};
use std::sync::Arc;

/// Characters escaped when a stripped path has to be re-encoded
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Handler invoked for every unresolvable request
pub type NotFoundHandler = Arc<dyn Fn(&Request<()>) -> Response<Full<Bytes>> + Send + Sync>;

/// Options for a [`FileServer`]
///
/// | option       | default              |
/// |--------------|----------------------|
/// | `not_found`  | plain `404 Not Found` |
/// | `url_prefix` | `/`                  |
/// | `use_etag`   | `true`               |
#[derive(Clone)]
pub struct ServeConfig {
    not_found: Option<NotFoundHandler>,
    url_prefix: String,
    use_etag: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            not_found: None,
            url_prefix: "/".to_string(),
            use_etag: true,
        }
    }
}

impl fmt::Debug for ServeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeConfig")
            .field("not_found", &self.not_found.as_ref().map(|_| "custom"))
            .field("url_prefix", &self.url_prefix)
            .field("use_etag", &self.use_etag)
            .finish()
    }
}

impl ServeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn not_found<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request<()>) -> Response<Full<Bytes>> + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Prefix removed from request paths before lookup, e.g. `/static/`
    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn use_etag(mut self, enabled: bool) -> Self {
        self.use_etag = enabled;
        self
    }
}

/// Request handler over an [`EmbedFs`]
///
/// Holds no mutable state; clone it freely or share it behind an `Arc`.
pub struct FileServer<S> {
    fs: Arc<EmbedFs<S>>,
    /// Configured prefix without trailing slashes, empty for none
    prefix: String,
    etag: Option<String>,
    not_found: NotFoundHandler,
}

impl<S> Clone for FileServer<S> {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            prefix: self.prefix.clone(),
            etag: self.etag.clone(),
            not_found: Arc::clone(&self.not_found),
        }
    }
}

impl<S> fmt::Debug for FileServer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileServer")
            .field("prefix", &self.prefix)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

impl<S: BackingStore> FileServer<S> {
    pub fn new(fs: Arc<EmbedFs<S>>, config: ServeConfig) -> Self {
        let prefix = config.url_prefix.trim_end_matches('/').to_string();
        let etag = if config.use_etag {
            cache::quote_etag(fs.etag_token())
        } else {
            None
        };
        let not_found: NotFoundHandler = match config.not_found {
            Some(handler) => handler,
            None => Arc::new(|_: &Request<()>| http::build_404_response()),
        };

        Self {
            fs,
            prefix,
            etag,
            not_found,
        }
    }

    /// `ETag` value attached to served files, if enabled
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Route one request
    ///
    /// The request body is never read.
    pub fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let (parts, _body) = req.into_parts();
        let mut req = Request::from_parts(parts, ());

        let decoded = decode_path(req.uri().path()).into_owned();
        let path = if self.prefix.is_empty() {
            decoded
        } else {
            // the prefix must end on a segment boundary
            let stripped = match decoded.strip_prefix(self.prefix.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => return (self.not_found)(&req),
            };
            let stripped = stripped.to_string();
            self.strip_uri_prefix(&mut req, &stripped);
            stripped
        };

        self.resolve(&req, &path)
    }

    fn resolve(&self, req: &Request<()>, path: &str) -> Response<Full<Bytes>> {
        match self.fs.is_dir(path) {
            Err(_) => (self.not_found)(req),
            Ok(false) => self.transfer(req, path),
            Ok(true) => {
                let normalized = index::normalize(path);
                let dir = normalized.strip_suffix('/').unwrap_or(&normalized);
                let index_html = format!("{dir}/index.html");
                if self.fs.index().contains(&index_html) {
                    self.transfer(req, &index_html)
                } else {
                    (self.not_found)(req)
                }
            }
        }
    }

    fn transfer(&self, req: &Request<()>, path: &str) -> Response<Full<Bytes>> {
        transfer::serve_file(self.fs.store(), req, path, self.etag.as_deref())
    }

    /// Rewrite the request URI so downstream handlers see the stripped path
    ///
    /// The raw path keeps its original escaping when it carries the prefix
    /// verbatim; otherwise the decoded remainder is re-encoded.
    fn strip_uri_prefix(&self, req: &mut Request<()>, decoded_rest: &str) {
        let uri = req.uri();
        let raw_rest = match uri.path().strip_prefix(self.prefix.as_str()) {
            Some(raw) => raw.to_string(),
            None => utf8_percent_encode(decoded_rest, PATH).to_string(),
        };
        let path = if raw_rest.starts_with('/') {
            raw_rest
        } else {
            format!("/{raw_rest}")
        };
        let path_and_query = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        let mut parts = uri.clone().into_parts();
        let Ok(pq) = PathAndQuery::try_from(path_and_query) else {
            return;
        };
        parts.path_and_query = Some(pq);
        if let Ok(stripped) = Uri::from_parts(parts) {
            *req.uri_mut() = stripped;
        }
    }
}

impl<S, B> hyper::service::Service<Request<B>> for FileServer<S>
where
    S: BackingStore,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        ready(Ok(self.handle(req)))
    }
}

/// Percent-decode a request path, replacing invalid UTF-8
fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use http_body_util::BodyExt;
    use hyper::service::Service;
    use hyper::StatusCode;

    fn fs() -> Arc<EmbedFs<MemoryStore>> {
        let store = MemoryStore::from_files([
            ("a.txt", &b"hi"[..]),
            ("sub/index.html", &b"<h1>x</h1>"[..]),
            ("bare/data.json", &b"{}"[..]),
            ("with space.txt", &b"sp"[..]),
        ])
        .unwrap();
        Arc::new(EmbedFs::new(store))
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    async fn body(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_construction_normalizes() {
        let fs = fs();
        let server = fs.file_server(ServeConfig::new().url_prefix("/app//"));
        assert_eq!(server.prefix(), "/app");
        let quoted = format!("\"{}\"", fs.etag_token());
        assert_eq!(server.etag(), Some(quoted.as_str()));

        let server = fs.file_server(ServeConfig::new().url_prefix("/"));
        assert_eq!(server.prefix(), "");

        let server = fs.file_server(ServeConfig::new().use_etag(false));
        assert_eq!(server.etag(), None);
    }

    #[tokio::test]
    async fn test_file_served_with_etag() {
        let fs = fs();
        let server = fs.file_server(ServeConfig::default());
        let resp = server.handle(get("/a.txt"));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["ETag"].to_str().unwrap(),
            format!("\"{}\"", fs.etag_token())
        );
        assert_eq!(body(resp).await, "hi");
    }

    #[tokio::test]
    async fn test_directory_index() {
        let server = fs().file_server(ServeConfig::default());
        let with_slash = server.handle(get("/sub/"));
        let without_slash = server.handle(get("/sub"));
        assert_eq!(with_slash.status(), StatusCode::OK);
        assert_eq!(without_slash.status(), StatusCode::OK);
        assert_eq!(with_slash.headers()["ETag"], without_slash.headers()["ETag"]);
        assert_eq!(
            with_slash.headers()["Content-Type"],
            "text/html; charset=utf-8"
        );
        assert_eq!(body(with_slash).await, "<h1>x</h1>");
    }

    #[test]
    fn test_directory_without_index_is_not_found() {
        let server = fs().file_server(ServeConfig::default());
        assert_eq!(server.handle(get("/bare")).status(), StatusCode::NOT_FOUND);
        assert_eq!(server.handle(get("/bare/")).status(), StatusCode::NOT_FOUND);
        // root has no index.html either
        assert_eq!(server.handle(get("/")).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let server = fs().file_server(ServeConfig::default());
        assert_eq!(server.handle(get("/missing")).status(), StatusCode::NOT_FOUND);
        assert_eq!(server.handle(get("/a.txt/")).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_prefix() {
        let server = fs().file_server(ServeConfig::new().url_prefix("/p"));
        assert_eq!(server.handle(get("/p/a.txt")).status(), StatusCode::OK);
        assert_eq!(server.handle(get("/p/sub/")).status(), StatusCode::OK);
        assert_eq!(server.handle(get("/a.txt")).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_prefix_needs_segment_boundary() {
        let server = fs().file_server(ServeConfig::new().url_prefix("/p"));
        assert_eq!(server.handle(get("/psub")).status(), StatusCode::NOT_FOUND);
        assert_eq!(server.handle(get("/psub/")).status(), StatusCode::NOT_FOUND);
        assert_eq!(server.handle(get("/pa.txt")).status(), StatusCode::NOT_FOUND);
        assert_eq!(server.handle(get("/p/sub")).status(), StatusCode::OK);
    }

    #[test]
    fn test_trailing_slash_prefix() {
        let server = fs().file_server(ServeConfig::new().url_prefix("/test/"));
        assert_eq!(server.handle(get("/test/a.txt")).status(), StatusCode::OK);
        assert!(server.handle(get("/test/a.txt")).headers().contains_key("ETag"));
    }

    #[test]
    fn test_percent_encoded_path() {
        let server = fs().file_server(ServeConfig::new().url_prefix("/p"));
        assert_eq!(
            server.handle(get("/p/with%20space.txt")).status(),
            StatusCode::OK
        );
    }

    #[test]
    fn test_custom_not_found_sees_stripped_uri() {
        let server = fs().file_server(
            ServeConfig::new()
                .url_prefix("/p")
                .not_found(|req: &Request<()>| {
                    Response::builder()
                        .status(StatusCode::GONE)
                        .header("X-Path", req.uri().to_string())
                        .body(Full::new(Bytes::new()))
                        .unwrap()
                }),
        );

        let resp = server.handle(get("/p/missing?x=1"));
        assert_eq!(resp.status(), StatusCode::GONE);
        assert_eq!(resp.headers()["X-Path"], "/missing?x=1");

        // prefix mismatch leaves the request untouched
        let resp = server.handle(get("/other"));
        assert_eq!(resp.headers()["X-Path"], "/other");
    }

    #[test]
    fn test_prefix_only_request_resolves_root() {
        let store = MemoryStore::from_files([("index.html", "home")]).unwrap();
        let server =
            Arc::new(EmbedFs::new(store)).file_server(ServeConfig::new().url_prefix("/p"));
        assert_eq!(server.handle(get("/p")).status(), StatusCode::OK);
        assert_eq!(server.handle(get("/p/")).status(), StatusCode::OK);
    }

    #[test]
    fn test_etag_disabled() {
        let server = fs().file_server(ServeConfig::new().use_etag(false));
        let resp = server.handle(get("/a.txt"));
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("ETag").is_none());
    }

    #[test]
    fn test_conditional_get() {
        let server = fs().file_server(ServeConfig::default());
        let etag = server.etag().unwrap().to_string();
        let req = Request::builder()
            .uri("/sub/")
            .header("If-None-Match", etag)
            .body(())
            .unwrap();
        assert_eq!(server.handle(req).status(), StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_idempotent() {
        let server = fs().file_server(ServeConfig::default());
        let first = server.handle(get("/sub"));
        let second = server.handle(get("/sub"));
        assert_eq!(first.status(), second.status());
        assert_eq!(first.headers(), second.headers());
    }

    #[tokio::test]
    async fn test_service_impl() {
        let server = fs().file_server(ServeConfig::default());
        let resp = server.call(get("/a.txt")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let server = Arc::new(fs().file_server(ServeConfig::default()));
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let server = Arc::clone(&server);
                tokio::spawn(async move {
                    let uri = if i % 2 == 0 { "/a.txt" } else { "/sub/" };
                    server.handle(get(uri)).status()
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), StatusCode::OK);
        }
    }
}
