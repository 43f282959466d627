//! Common error types for the geomag crates

use thiserror::Error;

use crate::component::Component;

/// Common result type for geomag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the geomag crates
#[derive(Error, Debug)]
pub enum Error {
    /// Unrecognized sampling period, data type or other query setting.
    /// Fatal at plan time and never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed IAGA2002 content. Fatal for one candidate body only.
    #[error("Invalid IAGA2002: {0}")]
    Format(String),

    /// Requested component is neither stored nor derivable
    #[error("Missing component {component}: require {alternatives}")]
    MissingComponent {
        component: Component,
        alternatives: &'static str,
    },

    /// Component code outside x, y, z, h, d, i, f
    #[error("Unknown component code: {0}")]
    UnknownComponent(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Format error tagged with the 1-based line it was found on
    pub(crate) fn format_at(line: usize, reason: impl std::fmt::Display) -> Self {
        Error::Format(format!("line {}: {}", line, reason))
    }
}
