//! Backing store abstraction
//!
//! A backing store is a read-only file tree addressed by relative,
//! slash-separated paths. The empty path (or `.`) names the root.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: an immutable in-process snapshot (bundled bytes,
//!   `rust-embed` assets, or a directory loaded once from disk)
//! - [`DiskStore`]: a live view over a directory on disk

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use hyper::body::Bytes;
use std::io::{self, Read};

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Entry returned by [`BackingStore::read_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Base name of the entry (no slashes)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Read-only file tree
///
/// Implementations must be safe to share between request tasks.
pub trait BackingStore: Send + Sync {
    /// Open a regular file for streaming reads
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>>;

    /// List a directory, sorted by entry name
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Read a whole regular file
    fn read_file(&self, path: &str) -> io::Result<Bytes>;

    /// Produce a view of this store rooted at `dir`
    fn sub(&self, dir: &str) -> io::Result<Self>
    where
        Self: Sized;
}

/// Normalize a store path to its canonical relative form
///
/// Leading and trailing slashes and `.` segments are dropped, the root
/// becomes the empty string. `..` segments are rejected.
pub fn clean_path(path: &str) -> io::Result<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("path escapes store root: {path}"),
                ))
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Join a relative directory path and an entry name
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

pub(crate) fn is_a_directory(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("is a directory: {path}"),
    )
}

pub(crate) fn not_a_directory(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("not a directory: {path}"),
    )
}
