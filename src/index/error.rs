//! Index error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while indexing or locating archives
#[derive(Error, Debug)]
pub enum IndexError {
    /// Storage root could not be read; fatal for an index build
    #[error("Cannot read storage root {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No archive file exists for a metric
    #[error("No archive found for metric: {0}")]
    NotFound(String),
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;
