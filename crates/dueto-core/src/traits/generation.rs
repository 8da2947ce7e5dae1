// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Question generation trait for the external webhook service.

use async_trait::async_trait;

use crate::documents::{ContextQuestionsDoc, ParticipantDoc};
use crate::error::DuetoError;
use crate::types::SlotPair;

/// Everything the question generator needs to know about a session.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    /// Session code, sent as the webhook's room identifier.
    pub code: String,
    /// The dilemma title.
    pub title: String,
    /// Both participants' profiles.
    pub participants: SlotPair<ParticipantDoc>,
}

/// Adapter for the external question-generation service.
///
/// Implementations own transport, retries and payload shapes; callers
/// only see per-slot question lists.
#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    /// Generate the personalized context question set for each slot.
    async fn context_questions(
        &self,
        profile: &SessionProfile,
    ) -> Result<SlotPair<Vec<String>>, DuetoError>;

    /// Generate the main question set for each slot from the context
    /// questions and answers both participants gave.
    async fn main_questions(
        &self,
        profile: &SessionProfile,
        context: &SlotPair<ContextQuestionsDoc>,
    ) -> Result<SlotPair<Vec<String>>, DuetoError>;
}
