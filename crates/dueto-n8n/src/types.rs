// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response types for the n8n generation webhooks.
//!
//! Field names follow the webhook's JSON contract, which mixes camelCase
//! envelope keys with Portuguese question/answer keys.

use serde::{Deserialize, Serialize};

use dueto_core::documents::{ContextQuestionsDoc, ParticipantDoc};
use dueto_core::{SessionProfile, Slot, SlotPair};

/// A participant profile as the webhook expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireParticipant {
    /// Display name.
    pub name: String,
    /// Free-text self introduction.
    pub intro: String,
}

impl From<&ParticipantDoc> for WireParticipant {
    fn from(doc: &ParticipantDoc) -> Self {
        Self {
            name: doc.name.clone(),
            intro: doc.intro.clone(),
        }
    }
}

/// Request body for `gen-context-questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextQuestionsRequest {
    /// Session code identifying the room.
    #[serde(rename = "roomId")]
    pub room_id: String,
    /// The dilemma title both participants are working on.
    #[serde(rename = "dilemmaTitle")]
    pub dilemma_title: String,
    /// First participant's profile.
    pub user1: WireParticipant,
    /// Second participant's profile.
    pub user2: WireParticipant,
}

impl ContextQuestionsRequest {
    pub fn from_profile(profile: &SessionProfile) -> Self {
        Self {
            room_id: profile.code.clone(),
            dilemma_title: profile.title.clone(),
            user1: (&profile.participants.user1).into(),
            user2: (&profile.participants.user2).into(),
        }
    }
}

/// One element of the `gen-context-questions` response array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextQuestionsEntry {
    /// Which participant these questions are for.
    pub user: Slot,
    /// Personalized context questions.
    pub perguntas: Vec<String>,
}

/// A participant's context round as sent to `gen-principal-questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireContext {
    /// The context questions the participant was asked.
    pub perguntas: Vec<String>,
    /// The answers they gave, index-aligned with `perguntas`.
    pub respostas: Vec<String>,
}

/// A participant profile plus their completed context round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireParticipantWithContext {
    /// Display name.
    pub name: String,
    /// Free-text self introduction.
    pub intro: String,
    /// Completed context question round.
    pub context: WireContext,
}

/// Request body for `gen-principal-questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainQuestionsRequest {
    /// Session code identifying the room.
    #[serde(rename = "roomId")]
    pub room_id: String,
    /// The dilemma title both participants are working on.
    #[serde(rename = "dilemmaTitle")]
    pub dilemma_title: String,
    /// First participant with context answers.
    pub user1: WireParticipantWithContext,
    /// Second participant with context answers.
    pub user2: WireParticipantWithContext,
}

impl MainQuestionsRequest {
    pub fn from_profile(profile: &SessionProfile, context: &SlotPair<ContextQuestionsDoc>) -> Self {
        let build = |participant: &ParticipantDoc, round: &ContextQuestionsDoc| {
            WireParticipantWithContext {
                name: participant.name.clone(),
                intro: participant.intro.clone(),
                context: WireContext {
                    perguntas: round.perguntas.clone(),
                    respostas: round.respostas.clone(),
                },
            }
        };
        Self {
            room_id: profile.code.clone(),
            dilemma_title: profile.title.clone(),
            user1: build(&profile.participants.user1, &context.user1),
            user2: build(&profile.participants.user2, &context.user2),
        }
    }
}

/// Response body for `gen-principal-questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainQuestionsResponse {
    /// Main questions for the first participant.
    pub user1: Vec<String>,
    /// Main questions for the second participant.
    pub user2: Vec<String>,
}
