// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Dueto integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MemoryDocumentStore`] - In-memory document store with a live change feed
//! - [`MockGeneration`] - Scripted question generator with failure injection
//! - [`TestHarness`] - Assembled store + generator + reconciler + gateway router

pub mod harness;
pub mod memory_store;
pub mod mock_generation;

pub use harness::TestHarness;
pub use memory_store::MemoryDocumentStore;
pub use mock_generation::MockGeneration;
