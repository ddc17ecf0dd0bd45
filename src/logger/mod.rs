//! Logger module
//!
//! Line-oriented logging shared by the library and the host binary:
//! - info and access lines go to stdout (or the access log file)
//! - warnings and errors go to stderr (or the error log file)
//!
//! Until [`init`] is called every line is printed to the console.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

/// Route log lines to files instead of the console
///
/// Should be called once at application startup.
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> std::io::Result<()> {
    writer::init(access_log_file, error_log_file)
}

fn write_info(message: &str) {
    if writer::is_initialized() {
        writer::get().write_info(message);
    } else {
        println!("{message}");
    }
}

fn write_error(message: &str) {
    if writer::is_initialized() {
        writer::get().write_error(message);
    } else {
        eprintln!("{message}");
    }
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_server_start(addr: &SocketAddr, root: &str, etag: &str) {
    write_info("======================================");
    write_info("embedserve started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Serving: {root}"));
    if etag.is_empty() {
        write_info("ETag: disabled");
    } else {
        write_info(&format!("ETag: {etag}"));
    }
    write_info("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    if writer::is_initialized() {
        writer::get().write_access(&line);
    } else {
        println!("{line}");
    }
}
