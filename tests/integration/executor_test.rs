//! End-to-end executor tests against a live PostgreSQL.
//!
//! Skipped unless DATABASE_URL is set.

use sql_console::classify::ErrorCategory;
use sql_console::db::{ConnectionParameters, Value};
use sql_console::query::StatementExecutor;

/// Helper to get test connection parameters from environment.
fn get_test_params() -> Option<ConnectionParameters> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ConnectionParameters::from_connection_string(&url).ok()
}

#[tokio::test]
async fn test_select_one() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = StatementExecutor::postgres()
        .execute(Some(&params), "SELECT 1 AS one")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["one".to_string()]);
    assert_eq!(result.fields.len(), 1);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get("one"), Some(&Value::Int(1)));
    assert_eq!(result.row_count, 1);
    assert_eq!(result.command, "SELECT");
}

#[tokio::test]
async fn test_unique_violation() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    // Both statements travel in one request, so the temp table lives long enough.
    let err = StatementExecutor::postgres()
        .execute(
            Some(&params),
            "CREATE TEMP TABLE dup_check (id int PRIMARY KEY); \
             INSERT INTO dup_check VALUES (1), (1);",
        )
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::ConstraintError);
    assert_eq!(err.code.as_deref(), Some("23505"));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_syntax_error() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = StatementExecutor::postgres()
        .execute(Some(&params), "SELEC 1 AS one")
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::SyntaxError);
    assert_eq!(err.code.as_deref(), Some("42601"));
    assert!(err.position.is_some());
}

#[tokio::test]
async fn test_undefined_table_is_permission_class() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = StatementExecutor::postgres()
        .execute(Some(&params), "SELECT * FROM nonexistent_table_xyz")
        .await
        .unwrap_err();

    assert_eq!(err.code.as_deref(), Some("42P01"));
    assert_eq!(err.category, ErrorCategory::PermissionError);
}

#[tokio::test]
async fn test_write_reports_affected_rows() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = StatementExecutor::postgres()
        .execute(
            Some(&params),
            "CREATE TEMP TABLE affected (id int); INSERT INTO affected VALUES (1), (2), (3);",
        )
        .await
        .unwrap();

    assert_eq!(result.command, "INSERT");
    assert_eq!(result.row_count, 3);
    assert!(result.rows.is_empty());
    assert_eq!(result.columns.len(), result.fields.len());
}

#[tokio::test]
async fn test_scalar_types() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = StatementExecutor::postgres()
        .execute(
            Some(&params),
            "SELECT true AS flag, 2.5::float8 AS ratio, 'x'::text AS label, \
             '\\x0102'::bytea AS blob, now() AS ts, NULL::text AS nothing, 1.10::numeric AS amount",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row.get("flag"), Some(&Value::Bool(true)));
    assert_eq!(row.get("ratio"), Some(&Value::Float(2.5)));
    assert_eq!(row.get("label"), Some(&Value::Text("x".to_string())));
    assert_eq!(row.get("blob"), Some(&Value::Bytes(vec![1, 2])));
    assert!(matches!(row.get("ts"), Some(Value::Timestamp(_))));
    assert_eq!(row.get("nothing"), Some(&Value::Null));
    assert_eq!(row.get("amount"), Some(&Value::Text("1.10".to_string())));
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreachable_host() {
    let params = ConnectionParameters::new("invalid.host.that.does.not.exist.local", 5432, "d", "u");

    let err = StatementExecutor::postgres()
        .execute(Some(&params), "SELECT 1")
        .await
        .unwrap_err();

    // No vendor code: the driver never reached a server.
    assert!(err.code.is_none());
    assert_eq!(err.category, ErrorCategory::QueryError);
    assert!(!err.is_client_error());
}
