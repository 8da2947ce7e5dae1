// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed document store for Dueto.
//!
//! Documents are JSON bodies keyed by slash-separated paths. Writes go
//! through a single async connection, and every committed write is
//! re-published on a broadcast channel for live subscribers.

pub mod database;
mod migrations;
pub mod store;

pub use database::Database;
pub use store::SqliteDocumentStore;
