//! Indexed, read-only file tree
//!
//! [`EmbedFs`] owns a backing store together with the path index and
//! content token computed from it at construction.

use crate::error::{Error, Result};
use crate::handler::{FileServer, ServeConfig};
use crate::index::{self, BuildMode, PathIndex};
use crate::logger;
use crate::store::{BackingStore, DirEntry, EntryKind};
use hyper::body::Bytes;
use std::io::{self, Read};
use std::sync::Arc;

/// Backing store plus its immutable path index and content token
#[derive(Debug)]
pub struct EmbedFs<S> {
    store: S,
    index: PathIndex,
    token: String,
}

/// Configures how an [`EmbedFs`] is constructed
#[derive(Debug)]
pub struct EmbedFsBuilder<S> {
    store: S,
    sub_dir: Option<String>,
    mode: BuildMode,
}

impl<S: BackingStore> EmbedFsBuilder<S> {
    /// Serve only the tree below `dir`
    #[must_use]
    pub fn sub_dir(mut self, dir: impl Into<String>) -> Self {
        self.sub_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Re-root the store if asked to, then walk and hash it
    ///
    /// In [`BuildMode::Lenient`] this never fails: a sub-directory that
    /// cannot be used falls back to the whole store and unreadable entries
    /// are left out of the index.
    pub fn build(self) -> Result<EmbedFs<S>> {
        let store = match self.sub_dir.as_deref() {
            Some(dir) if !dir.is_empty() => match self.store.sub(dir) {
                Ok(sub) => sub,
                Err(source) if self.mode == BuildMode::Strict => {
                    return Err(Error::SubDir {
                        dir: dir.to_string(),
                        source,
                    })
                }
                Err(e) => {
                    logger::log_warning(&format!(
                        "Cannot use sub-directory '{dir}' ({e}), serving the whole store"
                    ));
                    self.store
                }
            },
            _ => self.store,
        };

        let (index, token) = index::build_index(&store, self.mode)?;
        Ok(EmbedFs {
            store,
            index,
            token,
        })
    }
}

impl<S: BackingStore> EmbedFs<S> {
    pub fn builder(store: S) -> EmbedFsBuilder<S> {
        EmbedFsBuilder {
            store,
            sub_dir: None,
            mode: BuildMode::Lenient,
        }
    }

    /// Index the whole store, skipping unreadable entries
    pub fn new(store: S) -> Self {
        Self::build_lenient(Self::builder(store))
    }

    /// Index the tree below `sub_dir`, falling back to the whole store
    /// when `sub_dir` cannot be used
    pub fn with_sub_dir(store: S, sub_dir: &str) -> Self {
        Self::build_lenient(Self::builder(store).sub_dir(sub_dir))
    }

    fn build_lenient(builder: EmbedFsBuilder<S>) -> Self {
        match builder.build() {
            Ok(fs) => fs,
            // lenient builds only fail if the store misreports itself
            Err(e) => unreachable!("lenient build failed: {e}"),
        }
    }

    pub fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        self.store.open(path)
    }

    pub fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        self.store.read_dir(path)
    }

    pub fn read_file(&self, path: &str) -> io::Result<Bytes> {
        self.store.read_file(path)
    }

    /// Walk the (possibly re-rooted) store, see [`index::walk`]
    pub fn walk<F, E>(&self, root: &str, visit: F) -> std::result::Result<(), E>
    where
        F: FnMut(&str, io::Result<EntryKind>) -> std::result::Result<(), E>,
    {
        index::walk(&self.store, root, visit)
    }

    /// Whether `path` is a directory; `Error::NotFound` when unknown
    pub fn is_dir(&self, path: &str) -> Result<bool> {
        self.index.is_dir(path)
    }

    /// Hex digest over every file's bytes
    pub fn etag_token(&self) -> &str {
        &self.token
    }

    pub const fn index(&self) -> &PathIndex {
        &self.index
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Build a request handler serving this tree
    pub fn file_server(self: &Arc<Self>, config: ServeConfig) -> FileServer<S> {
        FileServer::new(Arc::clone(self), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        MemoryStore::from_files([
            ("a.txt", "hi"),
            ("sub/index.html", "<h1>x</h1>"),
            ("dist/app.js", "app"),
        ])
        .unwrap()
    }

    #[test]
    fn test_files_and_dirs() {
        let fs = EmbedFs::new(store());
        for file in ["a.txt", "/a.txt", "sub/index.html", "dist/app.js"] {
            assert!(!fs.is_dir(file).unwrap(), "{file} should be a file");
        }
        for dir in ["", "/", "sub", "sub/", "/dist"] {
            assert!(fs.is_dir(dir).unwrap(), "{dir} should be a directory");
        }
        assert!(fs.is_dir("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_query_surface_passes_through() {
        let fs = EmbedFs::new(store());
        assert_eq!(fs.read_file("a.txt").unwrap(), "hi");
        assert_eq!(fs.read_dir("sub").unwrap().len(), 1);

        let mut buf = String::new();
        fs.open("dist/app.js").unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "app");

        let mut files = 0;
        fs.walk(".", |_, kind| -> std::result::Result<(), ()> {
            if matches!(kind, Ok(EntryKind::File)) {
                files += 1;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(files, 3);
    }

    #[test]
    fn test_sub_dir_reroots() {
        let fs = EmbedFs::with_sub_dir(store(), "dist");
        assert!(!fs.is_dir("app.js").unwrap());
        assert!(fs.is_dir("a.txt").is_err());
        assert_eq!(fs.read_file("app.js").unwrap(), "app");
    }

    #[test]
    fn test_empty_sub_dir_is_ignored() {
        let fs = EmbedFs::with_sub_dir(store(), "");
        assert!(!fs.is_dir("a.txt").unwrap());
    }

    #[test]
    fn test_lenient_sub_dir_fallback() {
        let fs = EmbedFs::with_sub_dir(store(), "missing");
        assert!(!fs.is_dir("a.txt").unwrap());
        assert_eq!(fs.etag_token(), EmbedFs::new(store()).etag_token());
    }

    #[test]
    fn test_strict_sub_dir_failure() {
        let err = EmbedFs::builder(store())
            .sub_dir("missing")
            .mode(BuildMode::Strict)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SubDir { ref dir, .. } if dir == "missing"));
    }

    #[test]
    fn test_token_tracks_sub_dir_contents() {
        let whole = EmbedFs::new(store());
        let dist = EmbedFs::with_sub_dir(store(), "dist");
        assert_ne!(whole.etag_token(), dist.etag_token());
    }
}
