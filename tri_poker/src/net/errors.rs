//! Network error types for the line transport.

use thiserror::Error;

/// Errors that can occur while reading or writing participant lines
#[derive(Debug, Error)]
pub enum NetError {
    /// Underlying socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the maximum allowed length
    #[error("line of {actual}+ bytes exceeds maximum {max}")]
    LineTooLong { actual: usize, max: usize },

    /// The peer hung up before sending a username
    #[error("connection closed before a username was sent")]
    ClosedBeforeUsername,

    /// The first line was blank
    #[error("username line was empty")]
    EmptyUsername,

    /// The host stopped accepting participants
    #[error("host is no longer accepting participants")]
    HostClosed,
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, NetError>;
