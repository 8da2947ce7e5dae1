// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the Dueto crates.
//!
//! Both traits use `#[async_trait]` for dynamic dispatch compatibility, so
//! the gateway and reconciler can hold `Arc<dyn …>` and tests can swap in
//! in-memory implementations.

pub mod generation;
pub mod store;

pub use generation::{GenerationAdapter, SessionProfile};
pub use store::{get_typed, DocumentEvent, DocumentStore};
