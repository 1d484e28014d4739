//! Raw failure shapes, decided where a failure is first observed.

use sqlx::postgres::{PgDatabaseError, PgErrorPosition};
use std::any::Any;

/// A failure reported by the database with a vendor error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorError {
    /// SQLSTATE code, e.g. `23505`.
    pub code: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    /// Character offset into the statement where the error was detected.
    pub position: Option<String>,
}

impl VendorError {
    /// Creates a vendor error with a code and message and no extra fields.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            detail: None,
            hint: None,
            position: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }
}

/// Everything that can go wrong between receiving a request and answering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// Database error carrying a vendor code and optional detail fields.
    Vendor(VendorError),
    /// Driver or transport failure with only a message.
    Generic { message: String },
    /// Failure with no recognizable shape, e.g. a panic payload.
    Unknown { message: Option<String> },
}

impl RawFailure {
    /// Creates a generic failure from anything displayable.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Builds a failure from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Some((*s).to_string())
        } else {
            payload.downcast_ref::<String>().cloned()
        };
        Self::Unknown { message }
    }
}

impl From<sqlx::Error> for RawFailure {
    fn from(error: sqlx::Error) -> Self {
        let Some(db_error) = error.as_database_error() else {
            return Self::generic(error.to_string());
        };

        if let Some(pg_error) = db_error.try_downcast_ref::<PgDatabaseError>() {
            return Self::Vendor(VendorError {
                code: Some(pg_error.code().to_string()),
                message: pg_error.message().to_string(),
                detail: pg_error.detail().map(String::from),
                hint: pg_error.hint().map(String::from),
                position: pg_error.position().map(render_position),
            });
        }

        Self::Vendor(VendorError {
            code: db_error.code().map(|code| code.into_owned()),
            message: db_error.message().to_string(),
            detail: None,
            hint: None,
            position: None,
        })
    }
}

fn render_position(position: PgErrorPosition<'_>) -> String {
    match position {
        PgErrorPosition::Original(offset) => offset.to_string(),
        PgErrorPosition::Internal { position, .. } => position.to_string(),
    }
}
