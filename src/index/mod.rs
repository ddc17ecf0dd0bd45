//! Path index module
//!
//! Walks a backing store once and records, for every path, whether it is a
//! directory. The same walk feeds every file's bytes into one MD5
//! accumulator whose hex digest becomes the content validation token.

pub mod walk;

pub use walk::walk;

use crate::error::{Error, Result};
use crate::logger;
use crate::store::{BackingStore, EntryKind};
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::io;

/// How construction treats unreadable entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Skip anything that cannot be read, log a warning, never fail
    #[default]
    Lenient,
    /// Fail on the first unreadable entry or unusable sub-directory
    Strict,
}

/// Immutable map from slash-rooted URL path to "is directory"
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    paths: HashMap<String, bool>,
}

impl PathIndex {
    /// Look a path up exactly as given
    pub fn get(&self, path: &str) -> Option<bool> {
        self.paths.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Classify a path after normalizing its leading slashes
    ///
    /// `""`, `"/"` and `"//"` all name the root.
    pub fn is_dir(&self, path: &str) -> Result<bool> {
        let normalized = normalize(path);
        self.get(&normalized).ok_or(Error::NotFound(normalized))
    }

    /// Number of recorded paths (directories count twice)
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn insert_dir(&mut self, url_path: String) {
        self.paths.insert(format!("{url_path}/"), true);
        self.paths.insert(url_path, true);
    }
}

/// Replace any leading slashes with exactly one
pub fn normalize(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Walk `store` from its root, returning the index and the hex token
pub fn build_index<S>(store: &S, mode: BuildMode) -> Result<(PathIndex, String)>
where
    S: BackingStore + ?Sized,
{
    let mut index = PathIndex::default();
    index.paths.insert("/".to_string(), true);
    let mut hasher = Md5::new();

    walk(store, ".", |path, kind| -> Result<()> {
        let kind = match kind {
            Ok(kind) => kind,
            Err(e) => return skip(mode, path, e),
        };
        if path == "." {
            return Ok(());
        }

        let url_path = format!("/{path}");
        match kind {
            EntryKind::Dir => index.insert_dir(url_path),
            EntryKind::File => {
                if let Err(e) = hash_file(store, path, &mut hasher) {
                    skip(mode, path, e)?;
                }
                index.paths.insert(url_path, false);
            }
        }
        Ok(())
    })?;

    let token = format!("{:x}", hasher.finalize());
    Ok((index, token))
}

fn hash_file<S>(store: &S, path: &str, hasher: &mut Md5) -> io::Result<()>
where
    S: BackingStore + ?Sized,
{
    let mut reader = store.open(path)?;
    io::copy(&mut reader, hasher)?;
    Ok(())
}

fn skip(mode: BuildMode, path: &str, err: io::Error) -> Result<()> {
    match mode {
        BuildMode::Strict => Err(Error::io(path, err)),
        BuildMode::Lenient => {
            logger::log_warning(&format!("Skipping unreadable entry '{path}': {err}"));
            Ok(())
        }
    }
}
