//! On-disk directory store

use super::{clean_path, is_a_directory, not_a_directory, BackingStore, DirEntry, EntryKind};
use crate::logger;
use hyper::body::Bytes;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read-only view over a directory on disk
///
/// Contents are read on every call; the index built on top of it only
/// stays accurate while the directory is left untouched.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let clean = clean_path(path)?;
        if clean.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(clean))
        }
    }
}

impl BackingStore for DiskStore {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(is_a_directory(path));
        }
        Ok(Box::new(fs::File::open(full)?))
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let full = self.resolve(path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(full)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    logger::log_warning(&format!("Skipping entry in '{path}': {e}"));
                    continue;
                }
            };
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // follows symlinks, dangling ones are left out
            let kind = match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_dir() => EntryKind::Dir,
                Ok(_) => EntryKind::File,
                Err(e) => {
                    logger::log_warning(&format!("Skipping unreadable entry '{name}': {e}"));
                    continue;
                }
            };
            entries.push(DirEntry::new(name, kind));
        }
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    fn read_file(&self, path: &str) -> io::Result<Bytes> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(is_a_directory(path));
        }
        fs::read(full).map(Bytes::from)
    }

    fn sub(&self, dir: &str) -> io::Result<Self> {
        let full = self.resolve(dir)?;
        if !full.is_dir() {
            return Err(not_a_directory(dir));
        }
        Ok(Self::new(full))
    }
}
