// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dueto serve` command implementation.
//!
//! Starts the SQLite document store, the reconciler that drives question
//! generation, and the HTTP/WebSocket gateway. Supports graceful shutdown
//! via signal handlers: the gateway drains first, then the reconciler
//! stops and the store is flushed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use dueto_config::DuetoConfig;
use dueto_core::{DocumentStore, DuetoError, GenerationAdapter};
use dueto_gateway::{start_server, AppState, ServerConfig};
use dueto_n8n::client::N8nClient;
use dueto_n8n::N8nGenerator;
use dueto_session::Reconciler;
use dueto_store::{Database, SqliteDocumentStore};

use crate::shutdown;

/// Runs the `dueto serve` command.
pub async fn run_serve(config: DuetoConfig) -> Result<(), DuetoError> {
    info!("starting dueto serve");

    let db = Database::open(&config.store.database_path, config.store.wal_mode).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db));
    info!(path = config.store.database_path.as_str(), "document store ready");

    let cancel = shutdown::install_signal_handler();

    // Without a webhook URL the reconciler has nothing to call; sessions
    // then stall at their generation stages, which only makes sense for
    // offline gateway testing.
    let reconciler_task = match &config.n8n.webhook_url {
        Some(url) => {
            let client = N8nClient::new(
                url.clone(),
                Duration::from_secs(config.n8n.timeout_secs),
                config.n8n.max_retries,
                Duration::from_millis(config.n8n.retry_base_ms),
            )?;
            let generator: Arc<dyn GenerationAdapter> = Arc::new(N8nGenerator::new(client));
            let reconciler = Arc::new(Reconciler::new(
                store.clone(),
                generator,
                config.session.context_answer_count,
                Duration::from_secs(config.session.resync_interval_secs),
            ));
            let reconciler_cancel = cancel.clone();
            info!(webhook_url = url.as_str(), "reconciler enabled");
            Some(tokio::spawn(async move {
                reconciler.run(reconciler_cancel).await;
            }))
        }
        None => {
            warn!("n8n.webhook_url not configured, question generation disabled");
            None
        }
    };

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let state = AppState {
        store: store.clone(),
    };
    let serve_result = start_server(&server_config, state, cancel.clone()).await;

    // The gateway has drained; stop the reconciler before closing the
    // store so no write lands on a closed connection.
    cancel.cancel();
    if let Some(task) = reconciler_task
        && task.await.is_err()
    {
        warn!("reconciler task panicked during shutdown");
    }
    store.close().await?;

    info!("dueto serve shutdown complete");
    serve_result
}
