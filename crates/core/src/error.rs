//! Error types for document loading and CSV records.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Document loading error.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read document {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// CSV record error.
#[derive(Error, Debug)]
pub enum CsvError {
    #[error("failed to read csv file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A type names itself, directly or through its ancestors.
    #[error("type cycle: {chain}")]
    TypeCycle { chain: String },
}
