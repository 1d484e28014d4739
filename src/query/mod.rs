//! Statement execution for sql-console.
//!
//! Isolates the connect/execute/disconnect lifecycle from the transports
//! (HTTP, CLI) that call it.

pub mod executor;

pub use executor::StatementExecutor;
