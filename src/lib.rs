//! Serve a bundled, read-only file tree over HTTP.
//!
//! An [`EmbedFs`] walks its [`store::BackingStore`] once, classifying every
//! path as file or directory and hashing all file contents into a single
//! token. A [`FileServer`] built from it strips a URL prefix, falls back to
//! `index.html` for directories, tags responses with the token as `ETag`
//! and sends everything else to a not-found handler.
//!
//! ```
//! use std::sync::Arc;
//! use embedserve::{EmbedFs, ServeConfig};
//! use embedserve::store::MemoryStore;
//!
//! let store = MemoryStore::from_files([
//!     ("a.txt", &b"hi"[..]),
//!     ("sub/index.html", &b"<h1>x</h1>"[..]),
//! ])
//! .unwrap();
//! let fs = Arc::new(EmbedFs::new(store));
//! assert!(fs.is_dir("/sub").unwrap());
//!
//! let server = fs.file_server(ServeConfig::new().url_prefix("/static/"));
//! let req = hyper::Request::get("/static/sub/").body(()).unwrap();
//! assert_eq!(server.handle(req).status(), 200);
//! ```

pub mod embed_fs;
pub mod error;
pub mod handler;
pub mod http;
pub mod index;
pub mod logger;
pub mod store;

pub use embed_fs::{EmbedFs, EmbedFsBuilder};
pub use error::{Error, Result};
pub use handler::{FileServer, NotFoundHandler, ServeConfig};
pub use index::{BuildMode, PathIndex};
