//! Error types for sitemigrate.
//!
//! Library crates use [`SiteMigrateError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only failures live here. Outcomes that the batch tools treat as normal
//! (a missing export field, an excluded media record, a destination that
//! already exists) are modelled as values by the crates that produce them.

use std::path::PathBuf;

/// Top-level error type for all sitemigrate operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteMigrateError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input text could not be interpreted (dates, CSV headers, ...).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The origin answered with something other than `200 OK`.
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("network error: {0}")]
    Network(String),

    /// A redirect chain exceeded the configured hop limit.
    #[error("too many redirects ({hops}) starting at {url}")]
    TooManyRedirects { url: String, hops: u32 },

    /// Image decode or recompression failure.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A required input directory does not exist.
    #[error("directory not found: {}", path.display())]
    MissingDirectory { path: PathBuf },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteMigrateError>;

impl SiteMigrateError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
