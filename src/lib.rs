//! sql-console - run ad-hoc SQL against PostgreSQL over single-use connections.
//!
//! The core is [`query::StatementExecutor`], which opens one connection per
//! call, runs the statement, always closes the connection, and returns either
//! a [`db::QueryResult`] or a [`classify::ClassifiedError`].

pub mod api;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
