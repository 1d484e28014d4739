//! Error types for sql-console.
//!
//! `ConsoleError` covers the application around the executor (configuration,
//! serving, I/O). Failures of a submitted statement never use this type; they
//! are reported as [`crate::classify::ClassifiedError`].

use thiserror::Error;

/// Main error type for sql-console operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors (bind failure, serve loop failure)
    #[error("Server error: {0}")]
    Server(String),

    /// Filesystem and socket errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a server error with the given message.
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Server(_) => "Server Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ConsoleError.
pub type Result<T> = std::result::Result<T, ConsoleError>;
