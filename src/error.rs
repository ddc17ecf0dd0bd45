//! Error types
//!
//! Construction errors only surface in strict mode; at request time the
//! single observable failure is [`Error::NotFound`].

use std::io;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path is not present in the index
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading an entry of the backing store failed
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Re-rooting the backing store at a sub-directory failed
    #[error("cannot use sub-directory '{dir}': {source}")]
    SubDir {
        dir: String,
        #[source]
        source: io::Error,
    },

    /// Path escapes the store root or is otherwise unusable
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means "no such path"
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
