//! Error types for segwal
//!
//! Provides a unified error type for all segment operations.

use thiserror::Error;

/// Result type alias using WalError
pub type Result<T> = std::result::Result<T, WalError>;

/// Unified error type for segment operations
#[derive(Debug, Error)]
pub enum WalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("log entry not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Segment State Errors
    // -------------------------------------------------------------------------
    #[error("segment is sealed")]
    Sealed,

    #[error("segment is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("corruption detected: {0}")]
    Corrupt(String),

    #[error("entry payload of {size} bytes exceeds the {max} byte limit")]
    TooBig { size: usize, max: usize },

    /// Destination buffer too small for an encode or decode. Never returned
    /// from the public segment API; readers map it to `Corrupt`.
    #[error("buffer too short")]
    ShortBuffer,

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl WalError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WalError::NotFound)
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, WalError::Corrupt(_))
    }

    /// Collapse codec-internal errors into what the public API may return.
    pub(crate) fn surface(self) -> Self {
        match self {
            WalError::ShortBuffer => WalError::Corrupt("truncated frame".to_string()),
            other => other,
        }
    }
}
