//! Error types for geomag-fetch

use thiserror::Error;

/// Failure fetching one candidate location
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {uri}")]
    Status { uri: String, status: u16 },

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Gzip body could not be inflated
    #[error("Decompression error for {uri}: {reason}")]
    Decompress { uri: String, reason: String },
}

/// Why one candidate did not produce a record
#[derive(Debug, Error)]
pub enum FailedAttempt {
    #[error("{uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: FetchError,
    },

    #[error("{uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: geomag_common::Error,
    },

    /// Body decoded but held no station metadata
    #[error("{uri}: no IAGA2002 content")]
    Empty { uri: String },
}

impl FailedAttempt {
    pub fn uri(&self) -> &str {
        match self {
            FailedAttempt::Fetch { uri, .. }
            | FailedAttempt::Decode { uri, .. }
            | FailedAttempt::Empty { uri } => uri,
        }
    }
}

/// Retrieval failure for a whole query
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Query rejected before any fetch
    #[error("Invalid query: {0}")]
    Query(#[from] geomag_common::Error),

    /// Every candidate failed
    #[error("No candidate yielded IAGA2002 data ({} attempted)", .attempts.len())]
    Exhausted { attempts: Vec<FailedAttempt> },

    /// Cancelled before a candidate succeeded
    #[error("Retrieval cancelled after {attempted} attempts")]
    Cancelled { attempted: usize },
}

/// Convenience Result type for retrieval
pub type Result<T> = std::result::Result<T, RetrieveError>;
