// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-slot session stages derived from the document snapshot.
//!
//! A stage is never stored. It is recomputed from the session document
//! and the existence/content of the per-slot sub-documents, so every
//! reader (gateway view, terminal client, reconciler) derives the same
//! answer from the same documents.

use serde::{Deserialize, Serialize};

use dueto_core::documents::{
    self, ContextQuestionsDoc, MainAnswersDoc, MainQuestionsDoc, ParticipantDoc, SessionDoc,
};
use dueto_core::{
    get_typed, DocumentStore, DuetoError, SessionCode, SessionProfile, SessionStatus, Slot,
    SlotPair,
};

/// The screen a participant should currently see.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// This slot has not filled in the entry form yet.
    AwaitingEntry,
    /// Entered; the partner slot has not.
    AwaitingPartner,
    /// Both entered; context questions are being generated.
    GeneratingContextQuestions,
    /// This slot has unanswered context questions.
    AnsweringContextQuestions,
    /// Context answers submitted; waiting for the partner's.
    AwaitingContextPartner,
    /// Main questions are being generated.
    GeneratingMainQuestions,
    /// This slot has main questions to answer.
    AnsweringMainQuestions,
    /// Main answers submitted; waiting for the partner and the report.
    AwaitingMainPartner,
}

/// One consistent read of every document belonging to a session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub session: Option<SessionDoc>,
    pub participants: SlotPair<Option<ParticipantDoc>>,
    pub context_questions: SlotPair<Option<ContextQuestionsDoc>>,
    pub main_questions: SlotPair<Option<MainQuestionsDoc>>,
    pub main_answers: SlotPair<Option<MainAnswersDoc>>,
}

impl SessionSnapshot {
    /// Load every document for `code` from the store.
    pub async fn load(store: &dyn DocumentStore, code: &SessionCode) -> Result<Self, DuetoError> {
        let code = code.as_str();
        let mut snapshot = Self {
            session: get_typed(store, &documents::session_path(code)).await?,
            ..Default::default()
        };
        for slot in Slot::BOTH {
            *snapshot.participants.get_mut(slot) =
                get_typed(store, &documents::participant_path(code, slot)).await?;
            *snapshot.context_questions.get_mut(slot) =
                get_typed(store, &documents::context_questions_path(code, slot)).await?;
            *snapshot.main_questions.get_mut(slot) =
                get_typed(store, &documents::main_questions_path(code, slot)).await?;
            *snapshot.main_answers.get_mut(slot) =
                get_typed(store, &documents::main_answers_path(code, slot)).await?;
        }
        Ok(snapshot)
    }

    /// Derive the stage for one slot.
    ///
    /// Predicates are checked from the end of the flow backwards and the
    /// first match wins, so the main-question flow takes priority over
    /// the context flow once both sets of documents exist.
    pub fn stage_for(&self, slot: Slot) -> Stage {
        // Keyed on the answer document, not on client-side state, so a
        // reload after finalization cannot reopen the questions.
        if self.main_answers.get(slot).is_some() {
            return Stage::AwaitingMainPartner;
        }
        if let Some(session) = &self.session {
            if session.status == SessionStatus::MainQuestionsReady
                && self.main_questions.get(slot).is_some()
            {
                return Stage::AnsweringMainQuestions;
            }
            if session.status == SessionStatus::GeneratingMainQuestions {
                return Stage::GeneratingMainQuestions;
            }
        }
        if let Some(round) = self.context_questions.get(slot) {
            if !round.respostas.is_empty() && round.respostas.len() >= round.perguntas.len() {
                return Stage::AwaitingContextPartner;
            }
            return Stage::AnsweringContextQuestions;
        }
        if let Some(session) = &self.session
            && session.ready_for_context_questions
            && self.participants.user1.is_some()
            && self.participants.user2.is_some()
        {
            return Stage::GeneratingContextQuestions;
        }
        if self.participants.get(slot).is_some() {
            return Stage::AwaitingPartner;
        }
        Stage::AwaitingEntry
    }

    /// True when both slots hold exactly `expected` context answers.
    pub fn context_answers_complete(&self, expected: usize) -> bool {
        Slot::BOTH.into_iter().all(|slot| {
            self.context_questions
                .get(slot)
                .as_ref()
                .is_some_and(|round| round.respostas.len() == expected)
        })
    }

    /// Generation profile, available once the session and both
    /// participants exist.
    pub fn profile(&self, code: &SessionCode) -> Option<SessionProfile> {
        let session = self.session.as_ref()?;
        Some(SessionProfile {
            code: code.as_str().to_string(),
            title: session.title.clone(),
            participants: SlotPair {
                user1: self.participants.user1.clone()?,
                user2: self.participants.user2.clone()?,
            },
        })
    }

    /// Both context rounds, once both exist.
    pub fn context_rounds(&self) -> Option<SlotPair<ContextQuestionsDoc>> {
        Some(SlotPair {
            user1: self.context_questions.user1.clone()?,
            user2: self.context_questions.user2.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: SessionStatus, ready: bool, generated: bool) -> SessionDoc {
        SessionDoc {
            title: "Mudar de cidade?".into(),
            created_at: "2026-01-10T12:00:00Z".into(),
            status,
            ready_for_context_questions: ready,
            context_questions_generated: generated,
        }
    }

    fn participant(name: &str) -> ParticipantDoc {
        ParticipantDoc {
            name: name.into(),
            intro: "intro".into(),
            joined_at: "2026-01-10T12:00:00Z".into(),
        }
    }

    fn context(answered: usize) -> ContextQuestionsDoc {
        ContextQuestionsDoc {
            perguntas: vec!["P1".into(), "P2".into()],
            respostas: (0..answered).map(|i| format!("R{i}")).collect(),
        }
    }

    #[test]
    fn empty_snapshot_awaits_entry() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.stage_for(Slot::User1), Stage::AwaitingEntry);
        assert_eq!(snapshot.stage_for(Slot::User2), Stage::AwaitingEntry);
    }

    #[test]
    fn entered_slot_awaits_partner() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::WaitingForUser2, false, false)),
            participants: SlotPair {
                user1: Some(participant("Ana")),
                user2: None,
            },
            ..Default::default()
        };
        assert_eq!(snapshot.stage_for(Slot::User1), Stage::AwaitingPartner);
        assert_eq!(snapshot.stage_for(Slot::User2), Stage::AwaitingEntry);
    }

    #[test]
    fn both_entered_means_generating_context() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::WaitingForContextAnswers, true, false)),
            participants: SlotPair {
                user1: Some(participant("Ana")),
                user2: Some(participant("Bruno")),
            },
            ..Default::default()
        };
        assert_eq!(
            snapshot.stage_for(Slot::User1),
            Stage::GeneratingContextQuestions
        );
        assert_eq!(
            snapshot.stage_for(Slot::User2),
            Stage::GeneratingContextQuestions
        );
    }

    #[test]
    fn context_questions_present_means_answering() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::WaitingForContextAnswers, true, true)),
            participants: SlotPair {
                user1: Some(participant("Ana")),
                user2: Some(participant("Bruno")),
            },
            context_questions: SlotPair {
                user1: Some(context(0)),
                user2: Some(context(0)),
            },
            ..Default::default()
        };
        assert_eq!(
            snapshot.stage_for(Slot::User1),
            Stage::AnsweringContextQuestions
        );
    }

    #[test]
    fn partially_answered_context_is_still_answering() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::WaitingForContextAnswers, true, true)),
            context_questions: SlotPair {
                user1: Some(context(1)),
                user2: Some(context(0)),
            },
            ..Default::default()
        };
        assert_eq!(
            snapshot.stage_for(Slot::User1),
            Stage::AnsweringContextQuestions
        );
    }

    #[test]
    fn fully_answered_context_awaits_partner_per_slot() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::WaitingForContextAnswers, true, true)),
            context_questions: SlotPair {
                user1: Some(context(2)),
                user2: Some(context(0)),
            },
            ..Default::default()
        };
        assert_eq!(
            snapshot.stage_for(Slot::User1),
            Stage::AwaitingContextPartner
        );
        assert_eq!(
            snapshot.stage_for(Slot::User2),
            Stage::AnsweringContextQuestions
        );
    }

    #[test]
    fn generating_status_overrides_context_documents() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::GeneratingMainQuestions, true, true)),
            context_questions: SlotPair {
                user1: Some(context(2)),
                user2: Some(context(2)),
            },
            ..Default::default()
        };
        assert_eq!(
            snapshot.stage_for(Slot::User1),
            Stage::GeneratingMainQuestions
        );
    }

    #[test]
    fn ready_status_with_questions_means_answering_main() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::MainQuestionsReady, true, true)),
            context_questions: SlotPair {
                user1: Some(context(2)),
                user2: Some(context(2)),
            },
            main_questions: SlotPair {
                user1: Some(MainQuestionsDoc {
                    perguntas: vec!["M1".into()],
                }),
                user2: Some(MainQuestionsDoc {
                    perguntas: vec!["M1".into()],
                }),
            },
            ..Default::default()
        };
        assert_eq!(
            snapshot.stage_for(Slot::User2),
            Stage::AnsweringMainQuestions
        );
    }

    #[test]
    fn submitted_main_answers_dominate_everything() {
        let snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::MainQuestionsReady, true, true)),
            main_questions: SlotPair {
                user1: Some(MainQuestionsDoc {
                    perguntas: vec!["M1".into()],
                }),
                user2: Some(MainQuestionsDoc {
                    perguntas: vec!["M1".into()],
                }),
            },
            main_answers: SlotPair {
                user1: Some(MainAnswersDoc {
                    respostas: vec!["R1".into()],
                }),
                user2: None,
            },
            ..Default::default()
        };
        // A reload after submitting must not reopen the questions.
        assert_eq!(snapshot.stage_for(Slot::User1), Stage::AwaitingMainPartner);
        assert_eq!(
            snapshot.stage_for(Slot::User2),
            Stage::AnsweringMainQuestions
        );
    }

    #[test]
    fn context_answers_complete_requires_both_slots() {
        let mut snapshot = SessionSnapshot {
            context_questions: SlotPair {
                user1: Some(context(2)),
                user2: Some(context(1)),
            },
            ..Default::default()
        };
        assert!(!snapshot.context_answers_complete(2));

        snapshot.context_questions.user2 = Some(context(2));
        assert!(snapshot.context_answers_complete(2));
    }

    #[test]
    fn profile_requires_both_participants() {
        let code = SessionCode::parse("AB2CDEF").unwrap();
        let mut snapshot = SessionSnapshot {
            session: Some(session(SessionStatus::WaitingForUser2, false, false)),
            participants: SlotPair {
                user1: Some(participant("Ana")),
                user2: None,
            },
            ..Default::default()
        };
        assert!(snapshot.profile(&code).is_none());

        snapshot.participants.user2 = Some(participant("Bruno"));
        let profile = snapshot.profile(&code).unwrap();
        assert_eq!(profile.code, "AB2CDEF");
        assert_eq!(profile.participants.user2.name, "Bruno");
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_value(Stage::AnsweringMainQuestions).unwrap();
        assert_eq!(json, "answering_main_questions");
        assert_eq!(
            Stage::GeneratingContextQuestions.to_string(),
            "generating_context_questions"
        );
    }
}
