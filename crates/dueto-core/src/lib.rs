// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Dueto session service.
//!
//! This crate provides the error type, domain types, typed document model
//! and the trait seams (document store, question generation) used
//! throughout the Dueto workspace.

pub mod documents;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DuetoError;
pub use types::{HealthStatus, SessionCode, SessionStatus, Slot, SlotPair};

// Re-export the trait seams at crate root.
pub use traits::{get_typed, DocumentEvent, DocumentStore, GenerationAdapter, SessionProfile};
