//! HTTP handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::classify::{classify, ClassifiedError, RawFailure};
use crate::db::{ConnectionParameters, Connector, QueryResult};
use crate::query::StatementExecutor;

/// Body of `POST /api/query`.
///
/// Both fields are optional at the wire level so that a missing one is
/// answered with a classified error instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct StatementRequest {
    #[serde(default)]
    pub connection: Option<ConnectionParameters>,

    #[serde(default)]
    pub query: Option<String>,
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(self)).into_response()
    }
}

pub async fn health_check_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Runs one statement on a fresh connection.
pub async fn execute_query_handler<C: Connector + 'static>(
    State(executor): State<Arc<StatementExecutor<C>>>,
    body: Result<Json<StatementRequest>, JsonRejection>,
) -> Result<Json<QueryResult>, ClassifiedError> {
    let Json(request) = body.map_err(rejected_body)?;
    let statement = request.query.as_deref().unwrap_or_default();
    let result = executor
        .execute(request.connection.as_ref(), statement)
        .await?;
    Ok(Json(result))
}

/// Classifies a body the extractor could not turn into a request.
///
/// Well-formed JSON with unusable fields (a port out of range, a connection
/// missing its database) is a `CONNECTION_ERROR`. Anything else is an
/// unparseable request and goes through the generic path. Both are server
/// disposition.
fn rejected_body(rejection: JsonRejection) -> ClassifiedError {
    match rejection {
        JsonRejection::JsonDataError(err) => ClassifiedError::invalid_parameters(format!(
            "Invalid request parameters: {}",
            err.body_text()
        )),
        other => classify(&RawFailure::generic(other.body_text())),
    }
}
