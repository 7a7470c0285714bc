//! Errors surfaced by repository operations.

use std::path::{Path, PathBuf};

use shelf_schema::filename::FilenameError;
use thiserror::Error;

use crate::signer::SignError;

/// Errors raised while registering files or writing metadata.
///
/// Nothing is retried; every failure reaches the caller synchronously.
#[derive(Error, Debug)]
pub enum RepoError {
    /// Reading, hashing, writing, or moving a file failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// The file or directory being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The filename does not name a package file.
    #[error("Invalid filename: {0}")]
    Filename(#[from] FilenameError),

    /// The filename would resolve outside its package directory.
    #[error("Filename must be a bare name without path separators: '{0}'")]
    UnsafeFilename(String),

    /// A manifest could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The signing phase failed.
    #[error("Signing failed: {0}")]
    Sign(#[from] SignError),
}

impl RepoError {
    /// Build a closure that attaches `path` to an I/O error, for `map_err`.
    pub(crate) fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
