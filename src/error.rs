//! Error taxonomy shared by the indexer and the reader.
//!
//! A symbol that is absent from an existing index is not an error: lookups
//! resolve it to an empty source or path. Only a missing index file is fatal.

use std::path::PathBuf;

pub type Result<T, E = CinspectError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CinspectError {
    #[error("Path {} does not exist", .0.display())]
    PathNotFound(PathBuf),

    #[error("Index data not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Unsupported object kind: {0}")]
    UnsupportedObjectKind(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed index {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CinspectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A compilation unit the front end could not turn into a usable tree.
#[derive(Debug, thiserror::Error)]
#[error("Could not parse {}: {reason}", .path.display())]
pub struct ParseFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
