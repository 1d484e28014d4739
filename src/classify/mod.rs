//! Error classification for statement failures.
//!
//! Maps whatever went wrong during connect/execute into a [`ClassifiedError`]
//! with a category from a closed set, so callers can pick a display strategy
//! without knowing anything about the driver's error shapes.

mod raw;

pub use raw::{RawFailure, VendorError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message used when a failure carries nothing readable.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Message used when a request arrives without connection or statement.
pub const MISSING_PARAMETERS_MESSAGE: &str = "Missing required parameters: connection and query";

/// Stable error taxonomy consumed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// SQLSTATE class 08, or a request that could not be turned into a connection.
    ConnectionError,
    /// Fallback for everything without a recognized code.
    QueryError,
    /// SQLSTATE class XX (internal server error on the database side).
    NetworkError,
    /// SQLSTATE class 28.
    AuthenticationError,
    /// SQLSTATE class 42, except 42601.
    PermissionError,
    /// SQLSTATE 42601.
    SyntaxError,
    /// SQLSTATE class 23.
    ConstraintError,
}

impl ErrorCategory {
    /// Returns the wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::QueryError => "QUERY_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::PermissionError => "PERMISSION_ERROR",
            Self::SyntaxError => "SYNTAX_ERROR",
            Self::ConstraintError => "CONSTRAINT_ERROR",
        }
    }

    /// Picks the category for a vendor error code. First match wins.
    pub fn from_code(code: Option<&str>) -> Self {
        let Some(code) = code else {
            return Self::QueryError;
        };

        if code.starts_with("08") {
            Self::ConnectionError
        } else if code.starts_with("28") {
            Self::AuthenticationError
        } else if code == "42601" {
            Self::SyntaxError
        } else if code.starts_with("42") {
            Self::PermissionError
        } else if code.starts_with("23") {
            Self::ConstraintError
        } else if code.starts_with("XX") {
            Self::NetworkError
        } else {
            Self::QueryError
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is to blame for a failure, used to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// The database rejected the request (reported with a vendor code).
    Client,
    /// Anything that never reached a classified database answer.
    Server,
}

/// Structured failure returned by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub message: String,

    #[serde(rename = "type")]
    pub category: ErrorCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    #[serde(rename = "severity")]
    pub disposition: Disposition,
}

impl ClassifiedError {
    /// Error for a request missing its connection parameters or statement.
    pub fn missing_parameters() -> Self {
        Self::precondition(MISSING_PARAMETERS_MESSAGE)
    }

    /// Error for connection parameters that cannot describe a connection.
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::precondition(msg)
    }

    fn precondition(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            category: ErrorCategory::ConnectionError,
            code: None,
            detail: None,
            hint: None,
            position: None,
            disposition: Disposition::Server,
        }
    }

    /// Returns true if the failure should be reported as the caller's fault.
    pub fn is_client_error(&self) -> bool {
        self.disposition == Disposition::Client
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {}

/// Classifies a raw failure. Never fails.
pub fn classify(failure: &RawFailure) -> ClassifiedError {
    match failure {
        RawFailure::Vendor(vendor) => ClassifiedError {
            message: vendor.message.clone(),
            category: ErrorCategory::from_code(vendor.code.as_deref()),
            code: vendor.code.clone(),
            detail: vendor.detail.clone(),
            hint: vendor.hint.clone(),
            position: vendor.position.clone(),
            disposition: Disposition::Client,
        },
        RawFailure::Generic { message } => ClassifiedError {
            message: message.clone(),
            category: ErrorCategory::QueryError,
            code: None,
            detail: None,
            hint: None,
            position: None,
            disposition: Disposition::Server,
        },
        RawFailure::Unknown { message } => ClassifiedError {
            message: message
                .clone()
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            category: ErrorCategory::QueryError,
            code: None,
            detail: None,
            hint: None,
            position: None,
            disposition: Disposition::Server,
        },
    }
}
