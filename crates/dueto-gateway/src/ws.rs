// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket live feed of session document changes.
//!
//! Client connects with `GET /ws?dilemma={code}` and receives one JSON
//! frame per committed write to that session's documents:
//!
//! ```json
//! {"path": "dilemmas/AB2CDEF/users/user2", "data": {"name": "Bruno", ...}}
//! ```
//!
//! The feed is one-way; client frames other than close are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use dueto_core::{documents, SessionCode};

use crate::handlers::ErrorResponse;
use crate::server::AppState;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Session code whose changes to stream.
    dilemma: String,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Response {
    match SessionCode::parse(&params.dilemma) {
        Ok(code) => ws.on_upgrade(move |socket| handle_socket(socket, state, code)),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not found".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Forward this session's change events until either side disconnects.
async fn handle_socket(socket: WebSocket, state: AppState, code: SessionCode) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut events = state.store.subscribe();
    let report_path = documents::report_path(code.as_str());

    tracing::debug!(code = %code, "websocket feed opened");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let in_session = documents::session_code_of(&event.path)
                            == Some(code.as_str())
                            || event.path == report_path;
                        if !in_session {
                            continue;
                        }
                        let frame = json!({"path": event.path, "data": event.data}).to_string();
                        if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(code = %code, skipped, "websocket feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(code = %code, "websocket feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_params_deserialize_from_query() {
        let params: WsParams = serde_urlencoded_from_str("dilemma=AB2CDEF");
        assert_eq!(params.dilemma, "AB2CDEF");
    }

    fn serde_urlencoded_from_str(query: &str) -> WsParams {
        // Query extraction goes through serde; a plain map is enough here.
        serde_json::from_value(json!({
            "dilemma": query.split('=').nth(1).unwrap()
        }))
        .unwrap()
    }

    #[test]
    fn event_frames_are_path_plus_data() {
        let frame = json!({
            "path": "dilemmas/AB2CDEF",
            "data": {"status": "waiting_for_context_answers"}
        });
        let text = frame.to_string();
        assert!(text.contains("\"path\""));
        assert!(text.contains("waiting_for_context_answers"));
    }
}
