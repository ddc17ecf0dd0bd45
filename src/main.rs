use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use embedserve::logger;
use embedserve::store::{BackingStore, DiskStore, MemoryStore};
use embedserve::{EmbedFs, FileServer};
use tokio::net::TcpListener;

mod config;
mod server;

use server::ConnectionContext;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(
        cfg.logging.access_log_file.as_deref(),
        cfg.logging.error_log_file.as_deref(),
    )?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    // Index (and hash) everything before the listener exists
    if cfg.site.in_memory {
        let store = MemoryStore::load_dir(&cfg.site.root)?;
        let server = build_server(store, &cfg)?;
        serve(server, &cfg).await
    } else {
        let server = build_server(DiskStore::new(&cfg.site.root), &cfg)?;
        serve(server, &cfg).await
    }
}

fn build_server<S: BackingStore>(
    store: S,
    cfg: &config::Config,
) -> Result<FileServer<S>, embedserve::Error> {
    let mut builder = EmbedFs::builder(store).mode(cfg.site.build_mode());
    if let Some(sub_dir) = &cfg.site.sub_dir {
        builder = builder.sub_dir(sub_dir.clone());
    }
    let fs = Arc::new(builder.build()?);
    Ok(fs.file_server(cfg.site.serve_config()))
}

async fn serve<S>(
    file_server: FileServer<S>,
    cfg: &config::Config,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: BackingStore + 'static,
{
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let etag = file_server.etag().unwrap_or_default().to_string();
    let ctx = Arc::new(ConnectionContext {
        server: file_server,
        access_log: cfg.logging.access_log,
        access_log_format: cfg.logging.access_log_format.clone(),
        keep_alive: cfg.performance.keep_alive_timeout > 0,
        timeout: Duration::from_secs(
            cfg.performance
                .read_timeout
                .max(cfg.performance.write_timeout),
        ),
        max_connections: cfg.performance.max_connections,
        active: AtomicUsize::new(0),
    });
    logger::log_server_start(&addr, &cfg.site.root, &etag);

    accept_loop(listener, ctx).await;
    logger::log_info("Server stopped");
    Ok(())
}

async fn accept_loop<S>(listener: TcpListener, ctx: Arc<ConnectionContext<S>>)
where
    S: BackingStore + 'static,
{
    let shutdown = server::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => server::accept_connection(stream, peer_addr, &ctx),
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = &mut shutdown => break,
        }
    }
}
