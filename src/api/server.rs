//! HTTP server setup.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::handler::{execute_query_handler, health_check_handler};
use crate::config::ServerConfig;
use crate::db::Connector;
use crate::error::{ConsoleError, Result};
use crate::query::StatementExecutor;

/// Builds the application router around an executor.
pub fn router<C: Connector + 'static>(executor: StatementExecutor<C>) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .route("/api/query", post(execute_query_handler::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(executor))
}

/// Binds to the configured address and serves until Ctrl-C.
pub async fn start_server<C: Connector + 'static>(
    config: &ServerConfig,
    executor: StatementExecutor<C>,
) -> Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            ConsoleError::server(format!(
                "Failed to bind {}:{}: {e}",
                config.host, config.port
            ))
        })?;

    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(executor))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConsoleError::server(e.to_string()))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => warn!("Could not listen for shutdown signal: {e}"),
    }
}
