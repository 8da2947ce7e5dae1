// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock question generator for deterministic testing.
//!
//! `MockGeneration` implements `GenerationAdapter` with scripted question
//! lists, call counters, and failure injection, so reconciler and
//! end-to-end tests can assert exactly-once semantics and retry behavior
//! without a webhook.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use dueto_core::documents::ContextQuestionsDoc;
use dueto_core::{DuetoError, GenerationAdapter, SessionProfile, SlotPair};

/// Main questions produced per slot when none are scripted.
const DEFAULT_MAIN_COUNT: usize = 13;

/// A scripted question generator.
///
/// Each generation round counts its calls and fails its first N calls
/// when failure injection is configured; after the injected failures the
/// scripted (or default) questions come back normally.
pub struct MockGeneration {
    context_questions: SlotPair<Vec<String>>,
    main_questions: SlotPair<Vec<String>>,
    context_calls: AtomicUsize,
    main_calls: AtomicUsize,
    context_failures: AtomicUsize,
    main_failures: AtomicUsize,
}

impl MockGeneration {
    /// A generator with two context questions and a full default main
    /// set per slot.
    pub fn new() -> Self {
        let context = |n: usize| {
            (1..=2)
                .map(|i| format!("Pergunta de contexto {i} (user{n})"))
                .collect()
        };
        let main = |n: usize| {
            (1..=DEFAULT_MAIN_COUNT)
                .map(|i| format!("Pergunta principal {i} (user{n})"))
                .collect()
        };
        Self {
            context_questions: SlotPair {
                user1: context(1),
                user2: context(2),
            },
            main_questions: SlotPair {
                user1: main(1),
                user2: main(2),
            },
            context_calls: AtomicUsize::new(0),
            main_calls: AtomicUsize::new(0),
            context_failures: AtomicUsize::new(0),
            main_failures: AtomicUsize::new(0),
        }
    }

    /// Script the context questions returned for both slots.
    pub fn with_context_questions(mut self, questions: SlotPair<Vec<String>>) -> Self {
        self.context_questions = questions;
        self
    }

    /// Script the main questions returned for both slots.
    pub fn with_main_questions(mut self, questions: SlotPair<Vec<String>>) -> Self {
        self.main_questions = questions;
        self
    }

    /// Fail the first `n` context generation calls.
    pub fn fail_context_times(self, n: usize) -> Self {
        self.context_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the first `n` main generation calls.
    pub fn fail_main_times(self, n: usize) -> Self {
        self.main_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Context generation calls made so far, failed ones included.
    pub fn context_calls(&self) -> usize {
        self.context_calls.load(Ordering::SeqCst)
    }

    /// Main generation calls made so far, failed ones included.
    pub fn main_calls(&self) -> usize {
        self.main_calls.load(Ordering::SeqCst)
    }

    /// Consume one injected failure, if any remain.
    fn take_failure(failures: &AtomicUsize) -> bool {
        failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockGeneration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationAdapter for MockGeneration {
    async fn context_questions(
        &self,
        _profile: &SessionProfile,
    ) -> Result<SlotPair<Vec<String>>, DuetoError> {
        self.context_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.context_failures) {
            return Err(DuetoError::Generation {
                message: "injected context generation failure".to_string(),
                source: None,
            });
        }
        Ok(self.context_questions.clone())
    }

    async fn main_questions(
        &self,
        _profile: &SessionProfile,
        _context: &SlotPair<ContextQuestionsDoc>,
    ) -> Result<SlotPair<Vec<String>>, DuetoError> {
        self.main_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.main_failures) {
            return Err(DuetoError::Generation {
                message: "injected main generation failure".to_string(),
                source: None,
            });
        }
        Ok(self.main_questions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dueto_core::documents::ParticipantDoc;

    fn profile() -> SessionProfile {
        SessionProfile {
            code: "AB2CDEF".into(),
            title: "t".into(),
            participants: SlotPair {
                user1: ParticipantDoc {
                    name: "Ana".into(),
                    intro: "i".into(),
                    joined_at: "2026-01-10T12:00:00Z".into(),
                },
                user2: ParticipantDoc {
                    name: "Bruno".into(),
                    intro: "i".into(),
                    joined_at: "2026-01-10T12:05:00Z".into(),
                },
            },
        }
    }

    #[tokio::test]
    async fn defaults_are_two_context_and_thirteen_main() {
        let generation = MockGeneration::new();
        let context = generation.context_questions(&profile()).await.unwrap();
        assert_eq!(context.user1.len(), 2);
        assert_eq!(context.user2.len(), 2);

        let main = generation
            .main_questions(&profile(), &SlotPair::default())
            .await
            .unwrap();
        assert_eq!(main.user1.len(), DEFAULT_MAIN_COUNT);
        assert_ne!(main.user1, main.user2);
    }

    #[tokio::test]
    async fn injected_failures_run_out() {
        let generation = MockGeneration::new().fail_context_times(2);
        assert!(generation.context_questions(&profile()).await.is_err());
        assert!(generation.context_questions(&profile()).await.is_err());
        assert!(generation.context_questions(&profile()).await.is_ok());
        assert_eq!(generation.context_calls(), 3);
    }

    #[tokio::test]
    async fn scripted_questions_come_back_verbatim() {
        let generation = MockGeneration::new().with_main_questions(SlotPair {
            user1: vec!["M1".into()],
            user2: vec!["M2".into()],
        });
        let main = generation
            .main_questions(&profile(), &SlotPair::default())
            .await
            .unwrap();
        assert_eq!(main.user1, vec!["M1"]);
        assert_eq!(main.user2, vec!["M2"]);
        assert_eq!(generation.main_calls(), 1);
        assert_eq!(generation.context_calls(), 0);
    }
}
