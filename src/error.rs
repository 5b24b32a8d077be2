use crate::warehouse::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the warehouse.
///
/// Lookup misses are not errors: they produce a reconciliation entry and a
/// songplay row with null song/artist keys.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("Failed to open warehouse database {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Invalid record at line {line}: {source}")]
    Validation {
        line: usize,
        #[source]
        source: ValidationError,
    },

    #[error("File contains no records")]
    EmptyFile,

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write reconciliation report {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to process {path:?}: {source}")]
    FileFailed {
        path: PathBuf,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    pub fn validation(line: usize, source: ValidationError) -> Self {
        EtlError::Validation { line, source }
    }

    pub fn is_validation(&self) -> bool {
        match self {
            EtlError::Validation { .. } | EtlError::EmptyFile => true,
            EtlError::FileFailed { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}
