//! Statement execution over a single-use connection.
//!
//! Every call opens one session, runs the statement, and closes the session
//! again on every exit path. Failures come back as [`ClassifiedError`]s;
//! nothing escapes as a panic or an unclassified error.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::classify::{classify, ClassifiedError, RawFailure};
use crate::db::{ConnectionParameters, Connector, PostgresConnector, QueryResult};

/// Runs statements through a [`Connector`].
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor<C = PostgresConnector> {
    connector: C,
}

impl StatementExecutor<PostgresConnector> {
    /// Creates an executor backed by PostgreSQL.
    pub fn postgres() -> Self {
        Self::new(PostgresConnector::new())
    }
}

impl<C: Connector> StatementExecutor<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Returns the underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Executes `statement` verbatim against a fresh connection.
    ///
    /// Missing parameters or an empty statement fail with `CONNECTION_ERROR`
    /// before any connection is attempted.
    pub async fn execute(
        &self,
        params: Option<&ConnectionParameters>,
        statement: &str,
    ) -> Result<QueryResult, ClassifiedError> {
        let Some(params) = params else {
            return Err(ClassifiedError::missing_parameters());
        };
        if statement.is_empty() {
            return Err(ClassifiedError::missing_parameters());
        }
        params.validate()?;

        let opened = AssertUnwindSafe(self.connector.open(params))
            .catch_unwind()
            .await;
        let mut session = match opened {
            Ok(Ok(session)) => session,
            Ok(Err(failure)) => return Err(report(failure)),
            Err(payload) => return Err(report(RawFailure::from_panic(payload))),
        };

        let outcome = AssertUnwindSafe(session.run(statement))
            .catch_unwind()
            .await;

        // Close before looking at the outcome; its failure only gets logged.
        match AssertUnwindSafe(session.close()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => {
                warn!(
                    "Error closing connection to {}: {}",
                    params.display_string(),
                    classify(&failure)
                );
            }
            Err(payload) => {
                warn!(
                    "Error closing connection to {}: {}",
                    params.display_string(),
                    classify(&RawFailure::from_panic(payload))
                );
            }
        }

        match outcome {
            Ok(Ok(raw)) => {
                let result = raw.normalize();
                debug!(
                    "Statement succeeded: {} columns, row count {}",
                    result.columns.len(),
                    result.row_count
                );
                Ok(result)
            }
            Ok(Err(failure)) => Err(report(failure)),
            Err(payload) => Err(report(RawFailure::from_panic(payload))),
        }
    }
}

fn report(failure: RawFailure) -> ClassifiedError {
    let classified = classify(&failure);
    debug!("Statement failed: {}", classified);
    classified
}
