//! Error types for ingestion.

use std::path::PathBuf;

use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading input or writing normalized output failed.
    #[error("i/o error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("invalid geolocation url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The lookup could not reach the service (connect, handshake, timeout).
    #[error("geolocation request for {ip} failed: {reason}")]
    Transport { ip: String, reason: String },
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}
