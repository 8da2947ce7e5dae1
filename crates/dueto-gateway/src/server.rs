// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use dueto_core::{DocumentStore, DuetoError};

use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The document store every handler reads and writes.
    pub store: Arc<dyn DocumentStore>,
}

/// Gateway server configuration (mirrors ServerConfig from dueto-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the complete gateway router.
pub fn router(state: AppState) -> Router {
    // Unauthenticated liveness probe.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/dilemmas", post(handlers::create_dilemma))
        .route("/v1/dilemmas/{code}", get(handlers::get_dilemma))
        .route("/v1/dilemmas/{code}/view", get(handlers::get_view))
        .route("/v1/dilemmas/{code}/entry", post(handlers::post_entry))
        .route(
            "/v1/dilemmas/{code}/context-answers",
            post(handlers::post_context_answers),
        )
        .route(
            "/v1/dilemmas/{code}/main-answers",
            post(handlers::post_main_answers),
        )
        .route("/v1/reports/{code}", get(handlers::get_report))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP/WebSocket server.
///
/// Serves until the cancellation token trips, then drains in-flight
/// requests.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), DuetoError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DuetoError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| DuetoError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
