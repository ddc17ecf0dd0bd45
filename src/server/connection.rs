// Connection handling module
// Accepts TCP connections and serves HTTP/1.1 on them

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use embedserve::http as http_util;
use embedserve::logger::{self, AccessLogEntry};
use embedserve::store::BackingStore;
use embedserve::FileServer;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;

/// Everything a connection task needs, shared across all connections
pub struct ConnectionContext<S> {
    pub server: FileServer<S>,
    pub access_log: bool,
    pub access_log_format: String,
    pub keep_alive: bool,
    pub timeout: Duration,
    pub max_connections: Option<u64>,
    pub active: AtomicUsize,
}

/// Accept a connection unless the connection limit is reached
pub fn accept_connection<S>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    ctx: &Arc<ConnectionContext<S>>,
) where
    S: BackingStore + 'static,
{
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = ctx.active.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = ctx.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            ctx.active.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if ctx.access_log {
        logger::log_connection_accepted(&peer_addr);
    }
    handle_connection(stream, peer_addr, Arc::clone(ctx));
}

/// Serve one connection in its own task
fn handle_connection<S>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<ConnectionContext<S>>,
) where
    S: BackingStore + 'static,
{
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(ctx.keep_alive);

        let service_ctx = Arc::clone(&ctx);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let ctx = Arc::clone(&service_ctx);
                async move { Ok::<_, Infallible>(handle_request(&ctx, req, peer_addr)) }
            }),
        );

        match tokio::time::timeout(ctx.timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                ctx.timeout.as_secs()
            )),
        }

        ctx.active.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Method check, file serving and access logging for one request
pub fn handle_request<S, B>(
    ctx: &ConnectionContext<S>,
    req: Request<B>,
    peer_addr: SocketAddr,
) -> Response<Full<Bytes>>
where
    S: BackingStore,
{
    let started = Instant::now();
    let entry = ctx.access_log.then(|| request_entry(&req, peer_addr));

    let response = match *req.method() {
        Method::GET | Method::HEAD => ctx.server.handle(req),
        Method::OPTIONS => http_util::build_options_response(),
        _ => http_util::build_405_response(),
    };

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.elapsed = started.elapsed();
        logger::log_access(&entry, &ctx.access_log_format);
    }
    response
}

fn request_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let version = match req.version() {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().as_str(),
        req.uri().to_string(),
    );
    entry.http_version = version.to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}
