// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session flow for Dueto.
//!
//! Stages are derived per slot from the document snapshot
//! ([`stage::SessionSnapshot`]), the [`reconciler::Reconciler`] performs
//! the side-effecting generation transitions on the server, and the
//! [`collector`] and [`draft`] modules drive the client-side timed
//! main-question sequence.

pub mod collector;
pub mod draft;
pub mod reconciler;
pub mod stage;

pub use collector::{band_for, AnswerCollector, AnswerTimer, Progress, TimerBand};
pub use draft::{DraftStore, MainDraft};
pub use reconciler::Reconciler;
pub use stage::{SessionSnapshot, Stage};
