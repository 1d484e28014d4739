//! HTTP interface for sql-console.
//!
//! `POST /api/query` takes `{ "connection": {...}, "query": "..." }` and
//! answers with the query result (200), or with a classified error: 400 when
//! the database rejected the statement, 500 for everything else.

pub mod handler;
pub mod server;

pub use handler::StatementRequest;
pub use server::{router, start_server};
