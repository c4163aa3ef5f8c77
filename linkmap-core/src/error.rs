//! Error types for linkmap-core.

use linkmap_scanner::ScanError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The crawl itself could not run.
    #[error("crawl error: {0}")]
    Scan(#[from] ScanError),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Graph output could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
