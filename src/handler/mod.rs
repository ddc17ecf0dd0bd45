//! Request handler module
//!
//! [`FileServer`] routes a request through the path index and hands the
//! resolved file to the [`transfer`] primitive.

pub mod file_server;
pub mod transfer;

pub use file_server::{FileServer, NotFoundHandler, ServeConfig};
