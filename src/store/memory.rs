//! In-memory snapshot store
//!
//! Holds every file as shared [`Bytes`], so re-rooting and cloning never
//! copy file contents.

use super::{clean_path, is_a_directory, not_a_directory, BackingStore, DirEntry, EntryKind};
use crate::error::{Error, Result};
use crate::logger;
use hyper::body::Bytes;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read};
use std::path::Path;

/// Immutable file tree held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Bytes>,
    /// Every directory path, the root (`""`) included
    dirs: BTreeSet<String>,
}

impl MemoryStore {
    /// Create an empty store containing only the root directory
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());
        Self {
            files: BTreeMap::new(),
            dirs,
        }
    }

    /// Build a store from `(path, contents)` pairs
    ///
    /// Parent directories are created implicitly.
    ///
    /// ```
    /// use embedserve::store::MemoryStore;
    ///
    /// let store = MemoryStore::from_files([
    ///     ("a.txt", &b"hi"[..]),
    ///     ("sub/index.html", &b"<h1>x</h1>"[..]),
    /// ])
    /// .unwrap();
    /// assert_eq!(store.len(), 2);
    /// ```
    pub fn from_files<I, P, B>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: Into<Bytes>,
    {
        let mut store = Self::new();
        for (path, contents) in files {
            store.insert_file(path.as_ref(), contents)?;
        }
        Ok(store)
    }

    /// Snapshot every asset of a `rust-embed` bundle
    pub fn from_embed<E: rust_embed::RustEmbed>() -> Self {
        let mut store = Self::new();
        for name in E::iter() {
            let Some(file) = E::get(&name) else {
                continue;
            };
            let contents = match file.data {
                Cow::Borrowed(data) => Bytes::from_static(data),
                Cow::Owned(data) => Bytes::from(data),
            };
            if let Err(e) = store.insert_file(&name, contents) {
                logger::log_warning(&format!("Skipping embedded asset '{name}': {e}"));
            }
        }
        store
    }

    /// Load a directory tree from disk into memory
    ///
    /// Entries whose names are not valid UTF-8 are rejected. Entries that
    /// cannot be read (dangling symlinks, missing permissions) are logged and
    /// left out; only a failure to list `root` itself is an error.
    pub fn load_dir(root: impl AsRef<Path>) -> io::Result<Self> {
        let mut store = Self::new();
        load_dir_into(&mut store, root.as_ref(), "")?;
        Ok(store)
    }

    /// Add a file, creating its parent directories
    pub fn insert_file(&mut self, path: &str, contents: impl Into<Bytes>) -> Result<()> {
        let path = clean_path(path).map_err(|_| Error::InvalidPath(path.to_string()))?;
        if path.is_empty() || self.dirs.contains(&path) {
            return Err(Error::InvalidPath(path));
        }
        self.add_parents(&path)?;
        self.files.insert(path, contents.into());
        Ok(())
    }

    /// Add an (empty) directory, creating its parents
    pub fn insert_dir(&mut self, path: &str) -> Result<()> {
        let path = clean_path(path).map_err(|_| Error::InvalidPath(path.to_string()))?;
        if self.files.contains_key(&path) {
            return Err(Error::InvalidPath(path));
        }
        self.add_parents(&path)?;
        self.dirs.insert(path);
        Ok(())
    }

    /// Number of regular files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn add_parents(&mut self, path: &str) -> Result<()> {
        let mut end = 0;
        while let Some(pos) = path[end..].find('/') {
            let parent = &path[..end + pos];
            if self.files.contains_key(parent) {
                return Err(Error::InvalidPath(path.to_string()));
            }
            self.dirs.insert(parent.to_string());
            end += pos + 1;
        }
        Ok(())
    }

    fn lookup_file(&self, path: &str) -> io::Result<(String, &Bytes)> {
        let path = clean_path(path)?;
        if self.dirs.contains(&path) {
            return Err(is_a_directory(&path));
        }
        match self.files.get(&path) {
            Some(contents) => Ok((path, contents)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {path}"),
            )),
        }
    }
}

impl BackingStore for MemoryStore {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let (_, contents) = self.lookup_file(path)?;
        Ok(Box::new(Cursor::new(contents.clone())))
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let dir = clean_path(path)?;
        if !self.dirs.contains(&dir) {
            return Err(not_a_directory(&dir));
        }
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let children = |name: &String| -> Option<String> {
            let rest = name.strip_prefix(&prefix)?;
            (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
        };

        let mut entries: Vec<DirEntry> = self
            .dirs
            .iter()
            .filter_map(|d| children(d).map(|n| DirEntry::new(n, EntryKind::Dir)))
            .chain(
                self.files
                    .keys()
                    .filter_map(|f| children(f).map(|n| DirEntry::new(n, EntryKind::File))),
            )
            .collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }

    fn read_file(&self, path: &str) -> io::Result<Bytes> {
        self.lookup_file(path).map(|(_, contents)| contents.clone())
    }

    fn sub(&self, dir: &str) -> io::Result<Self> {
        let dir = clean_path(dir)?;
        if !self.dirs.contains(&dir) {
            return Err(not_a_directory(&dir));
        }
        if dir.is_empty() {
            return Ok(self.clone());
        }
        let prefix = format!("{dir}/");

        let files = self
            .files
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        let mut dirs: BTreeSet<String> = self
            .dirs
            .iter()
            .filter_map(|d| d.strip_prefix(&prefix).map(ToString::to_string))
            .collect();
        dirs.insert(String::new());

        Ok(Self { files, dirs })
    }
}

fn load_dir_into(store: &mut MemoryStore, dir: &Path, rel: &str) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                skip_entry(rel, &e);
                continue;
            }
        };
        let name = entry.file_name().into_string().map_err(|name| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non UTF-8 file name: {name:?}"),
            )
        })?;
        let rel_path = super::join_path(rel, &name);
        let full_path = entry.path();
        // follow symlinks
        let metadata = match std::fs::metadata(&full_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                skip_entry(&rel_path, &e);
                continue;
            }
        };

        if metadata.is_dir() {
            store.insert_dir(&rel_path).map_err(into_io)?;
            if let Err(e) = load_dir_into(store, &full_path, &rel_path) {
                skip_entry(&rel_path, &e);
            }
        } else if metadata.is_file() {
            match std::fs::read(&full_path) {
                Ok(contents) => store.insert_file(&rel_path, contents).map_err(into_io)?,
                Err(e) => skip_entry(&rel_path, &e),
            }
        }
    }
    Ok(())
}

fn skip_entry(path: &str, err: &io::Error) {
    logger::log_warning(&format!("Skipping unreadable entry '{path}': {err}"));
}

fn into_io(err: Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore {
        MemoryStore::from_files([
            ("a.txt", &b"hi"[..]),
            ("sub/index.html", &b"<h1>x</h1>"[..]),
            ("sub/deep/z.css", &b"body{}"[..]),
            ("b.txt", &b"bee"[..]),
        ])
        .unwrap()
    }

    #[test]
    fn test_read_dir_sorted_with_kinds() {
        let store = sample();
        let entries = store.read_dir(".").unwrap();
        let names: Vec<_> = entries.iter().map(DirEntry::name).collect();
        assert_eq!(names, ["a.txt", "b.txt", "sub"]);
        assert!(entries[2].is_dir());
        assert!(!entries[0].is_dir());

        let entries = store.read_dir("sub").unwrap();
        let names: Vec<_> = entries.iter().map(DirEntry::name).collect();
        assert_eq!(names, ["deep", "index.html"]);
    }

    #[test]
    fn test_read_dir_on_file_fails() {
        let err = sample().read_dir("a.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_file_and_open() {
        let store = sample();
        assert_eq!(store.read_file("/sub/index.html").unwrap(), "<h1>x</h1>");

        let mut buf = String::new();
        store.open("a.txt").unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hi");

        assert!(store.open("sub").is_err());
        assert_eq!(
            store.read_file("missing").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_sub_reroots() {
        let sub = sample().sub("sub").unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.read_file("index.html").unwrap(), "<h1>x</h1>");
        let names: Vec<_> = sub
            .read_dir("")
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, ["deep", "index.html"]);
    }

    #[test]
    fn test_sub_missing_dir_fails() {
        assert!(sample().sub("nope").is_err());
        assert!(sample().sub("a.txt").is_err());
    }

    #[test]
    fn test_insert_conflicts() {
        let mut store = sample();
        assert!(store.insert_file("sub", "x").is_err());
        assert!(store.insert_file("a.txt/inner", "x").is_err());
        assert!(store.insert_file("../escape", "x").is_err());
        assert!(store.insert_dir("a.txt").is_err());
    }

    #[test]
    fn test_empty_dir() {
        let mut store = MemoryStore::new();
        store.insert_dir("empty").unwrap();
        assert!(store.read_dir("empty").unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[derive(rust_embed::RustEmbed)]
    #[folder = "tests/fixtures/site/"]
    struct Site;

    #[test]
    fn test_from_embed() {
        let store = MemoryStore::from_embed::<Site>();
        assert_eq!(store.len(), 2);
        assert_eq!(store.read_file("a.txt").unwrap(), "hi");
        assert_eq!(store.read_file("sub/index.html").unwrap(), "<h1>x</h1>");
        assert!(store.read_dir("sub").is_ok());
    }

    #[test]
    fn test_load_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hi").unwrap();
        std::fs::create_dir_all(tmp.path().join("sub/empty")).unwrap();
        std::fs::write(tmp.path().join("sub/index.html"), "<h1>x</h1>").unwrap();

        let store = MemoryStore::load_dir(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.read_file("sub/index.html").unwrap(), "<h1>x</h1>");
        assert!(store.read_dir("sub/empty").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_dir_skips_dangling_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hi").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/index.html"), "<h1>x</h1>").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling")).unwrap();

        let store = MemoryStore::load_dir(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.read_file("dangling").is_err());

        let fs = crate::EmbedFs::new(store);
        assert!(!fs.is_dir("/a.txt").unwrap());
        assert!(fs.is_dir("/sub").unwrap());
    }
}
