// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket gateway for the Dueto session service.
//!
//! Exposes the document store to participant clients as a small REST API
//! (create / enter / answer / view / report) plus a per-session WebSocket
//! change feed. The gateway itself performs no generation; it writes
//! documents and lets the reconciler react.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{router, start_server, AppState, ServerConfig};
