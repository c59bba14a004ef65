//! Indexer type definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading workspace files.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Error when failing to read a file
    #[error("Failed to read file {path:?}: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
