//! Database abstraction layer for sql-console.
//!
//! A [`Connector`] opens exactly one [`Session`] per call; a session runs
//! statements and is closed explicitly. The executor only talks to these
//! traits, so tests can swap in a scripted backend.

mod mock;
mod params;
mod postgres;
mod types;

pub use mock::{ScriptedConnector, SessionScript};
pub use params::{ConnectionParameters, DEFAULT_PORT};
pub use postgres::PostgresConnector;
pub use types::{FieldDescriptor, QueryResult, RawResult, Row, Value};

use crate::classify::RawFailure;
use async_trait::async_trait;

/// Opens single-use database sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection and completes the handshake.
    async fn open(
        &self,
        params: &ConnectionParameters,
    ) -> std::result::Result<Box<dyn Session>, RawFailure>;
}

/// One open connection.
#[async_trait]
pub trait Session: Send {
    /// Submits the statement verbatim and collects its result.
    async fn run(&mut self, statement: &str) -> std::result::Result<RawResult, RawFailure>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> std::result::Result<(), RawFailure>;
}
