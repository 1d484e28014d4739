//! HTTP API tests.
//!
//! Drive the router with a scripted connector; no database needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use sql_console::api::router;
use sql_console::classify::{RawFailure, VendorError};
use sql_console::db::{ScriptedConnector, SessionScript};
use sql_console::query::StatementExecutor;
use tower::ServiceExt;

fn connection() -> Json {
    json!({
        "id": "3f1c",
        "name": "local",
        "host": "localhost",
        "port": 5432,
        "database": "d",
        "username": "u",
        "ssl": false
    })
}

async fn post_query(connector: ScriptedConnector, body: Json) -> (StatusCode, Json) {
    let app = router(StatementExecutor::new(connector));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/query")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = router(StatementExecutor::new(ScriptedConnector::select_one()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_query_success() {
    let connector = ScriptedConnector::select_one();

    let (status, body) = post_query(
        connector.clone(),
        json!({ "connection": connection(), "query": "SELECT 1 AS one" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"], json!(["one"]));
    assert_eq!(body["rows"], json!([{ "one": 1 }]));
    assert_eq!(body["rowCount"], json!(1));
    assert_eq!(body["command"], json!("SELECT"));
    assert_eq!(body["fields"][0]["name"], json!("one"));
    assert_eq!(connector.opens(), 1);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn test_vendor_error_is_bad_request() {
    let connector = ScriptedConnector::failing(RawFailure::Vendor(
        VendorError::new("23505", "duplicate key value violates unique constraint \"users_pkey\"")
            .with_detail("Key (id)=(1) already exists."),
    ));

    let (status, body) = post_query(
        connector,
        json!({ "connection": connection(), "query": "INSERT INTO users (id) VALUES (1)" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "message": "duplicate key value violates unique constraint \"users_pkey\"",
            "type": "CONSTRAINT_ERROR",
            "code": "23505",
            "detail": "Key (id)=(1) already exists.",
            "severity": "client",
        })
    );
}

#[tokio::test]
async fn test_generic_error_is_server_error() {
    let connector = ScriptedConnector::select_one().with_open(SessionScript::Fail(
        RawFailure::generic("error communicating with database: Connection refused"),
    ));

    let (status, body) = post_query(
        connector.clone(),
        json!({ "connection": connection(), "query": "SELECT 1" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("QUERY_ERROR"));
    assert_eq!(body["severity"], json!("server"));
    assert_eq!(connector.closes(), 0);
}

#[tokio::test]
async fn test_missing_connection() {
    let connector = ScriptedConnector::select_one();

    let (status, body) = post_query(connector.clone(), json!({ "query": "SELECT 1" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("CONNECTION_ERROR"));
    assert_eq!(
        body["message"],
        json!("Missing required parameters: connection and query")
    );
    assert_eq!(connector.opens(), 0);
}

#[tokio::test]
async fn test_missing_query() {
    let connector = ScriptedConnector::select_one();

    let (status, body) = post_query(connector.clone(), json!({ "connection": connection() })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("CONNECTION_ERROR"));
    assert_eq!(connector.opens(), 0);
}

async fn post_raw(body: &'static str) -> (StatusCode, Json) {
    let app = router(StatementExecutor::new(ScriptedConnector::select_one()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/query")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_unparseable_body_is_classified() {
    let (status, body) = post_raw("{not json").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("QUERY_ERROR"));
    assert_eq!(body["severity"], json!("server"));
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn test_port_out_of_range_is_connection_error() {
    let connector = ScriptedConnector::select_one();
    let mut conn = connection();
    conn["port"] = json!(70000);

    let (status, body) = post_query(
        connector.clone(),
        json!({ "connection": conn, "query": "SELECT 1" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("CONNECTION_ERROR"));
    assert_eq!(body["severity"], json!("server"));
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Invalid request parameters")));
    assert_eq!(connector.opens(), 0);
}

#[tokio::test]
async fn test_incomplete_connection_is_connection_error() {
    let connector = ScriptedConnector::select_one();

    let (status, body) = post_query(
        connector.clone(),
        json!({ "connection": { "host": "h", "port": 5432 }, "query": "SELECT 1" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("CONNECTION_ERROR"));
    assert_eq!(body["severity"], json!("server"));
    assert_eq!(connector.opens(), 0);
}

#[tokio::test]
async fn test_missing_content_type_is_classified() {
    let app = router(StatementExecutor::new(ScriptedConnector::select_one()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/query")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["type"], json!("QUERY_ERROR"));
}
