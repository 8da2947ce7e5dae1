// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! n8n webhook adapter for the Dueto question-generation service.
//!
//! This crate implements [`GenerationAdapter`] over two n8n webhook
//! endpoints, one per generation round, translating between session
//! documents and the webhook's wire contract.

pub mod client;
pub mod types;

use async_trait::async_trait;
use dueto_core::documents::ContextQuestionsDoc;
use dueto_core::{DuetoError, GenerationAdapter, SessionProfile, Slot, SlotPair};
use tracing::info;

use crate::client::N8nClient;
use crate::types::{ContextQuestionsRequest, MainQuestionsRequest};

/// Question generator backed by n8n webhooks, implementing [`GenerationAdapter`].
pub struct N8nGenerator {
    client: N8nClient,
}

impl N8nGenerator {
    pub fn new(client: N8nClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GenerationAdapter for N8nGenerator {
    async fn context_questions(
        &self,
        profile: &SessionProfile,
    ) -> Result<SlotPair<Vec<String>>, DuetoError> {
        let request = ContextQuestionsRequest::from_profile(profile);
        let entries = self.client.context_questions(&request).await?;

        // The response is an array keyed by slot, in no guaranteed order.
        let mut questions = SlotPair::<Vec<String>>::default();
        for entry in entries {
            *questions.get_mut(entry.user) = entry.perguntas;
        }
        for slot in Slot::BOTH {
            if questions.get(slot).is_empty() {
                return Err(DuetoError::Generation {
                    message: format!("webhook returned no context questions for {slot}"),
                    source: None,
                });
            }
        }

        info!(
            code = %profile.code,
            user1 = questions.user1.len(),
            user2 = questions.user2.len(),
            "context questions generated"
        );
        Ok(questions)
    }

    async fn main_questions(
        &self,
        profile: &SessionProfile,
        context: &SlotPair<ContextQuestionsDoc>,
    ) -> Result<SlotPair<Vec<String>>, DuetoError> {
        let request = MainQuestionsRequest::from_profile(profile, context);
        let response = self.client.main_questions(&request).await?;

        let questions = SlotPair {
            user1: response.user1,
            user2: response.user2,
        };
        for slot in Slot::BOTH {
            if questions.get(slot).is_empty() {
                return Err(DuetoError::Generation {
                    message: format!("webhook returned no main questions for {slot}"),
                    source: None,
                });
            }
        }

        info!(
            code = %profile.code,
            user1 = questions.user1.len(),
            user2 = questions.user2.len(),
            "main questions generated"
        );
        Ok(questions)
    }
}
