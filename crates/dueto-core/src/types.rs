// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Dueto workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DuetoError;

/// Alphabet for session codes. Excludes I, O, 0 and 1 to avoid
/// transcription mistakes when codes are shared verbally.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a session code.
pub const CODE_LEN: usize = 7;

/// Sentinel recorded when a participant does not answer within the
/// time budget. Kept verbatim for report-producer compatibility.
pub const UNANSWERED: &str = "não respondida";

/// Maximum length of a session title.
pub const TITLE_MAX_CHARS: usize = 64;

/// Maximum length of a participant name.
pub const NAME_MAX_CHARS: usize = 32;

/// Maximum length of a participant self-introduction.
pub const INTRO_MAX_CHARS: usize = 300;

/// Maximum length of a single answer.
pub const ANSWER_MAX_CHARS: usize = 400;

/// One of the two fixed participant roles in a session.
///
/// `user1` is the creator, `user2` the invitee. The serialized forms
/// appear in document paths, share links and webhook payloads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    User1,
    User2,
}

impl Slot {
    /// Both slots, in canonical order.
    pub const BOTH: [Slot; 2] = [Slot::User1, Slot::User2];

    /// The other participant's slot.
    pub fn partner(self) -> Slot {
        match self {
            Slot::User1 => Slot::User2,
            Slot::User2 => Slot::User1,
        }
    }
}

/// Stored lifecycle status of a session document.
///
/// Only moves forward through the variants; one-time transitions are
/// guarded with compare-and-swap merges on the session document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    WaitingForUser2,
    WaitingForContextAnswers,
    GeneratingMainQuestions,
    MainQuestionsReady,
    GeneratingReport,
    Finished,
}

/// A validated 7-character session code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionCode(String);

impl SessionCode {
    /// Generate a fresh random code from [`CODE_ALPHABET`].
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let code = (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse a code supplied by a participant.
    ///
    /// Rejects anything that is not exactly [`CODE_LEN`] characters from
    /// [`CODE_ALPHABET`].
    pub fn parse(s: &str) -> Result<Self, DuetoError> {
        let valid = s.len() == CODE_LEN
            && s.bytes().all(|b| CODE_ALPHABET.contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(DuetoError::InvalidCode {
                code: s.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pair of per-slot values, one for each participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotPair<T> {
    pub user1: T,
    pub user2: T,
}

impl<T> SlotPair<T> {
    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::User1 => &self.user1,
            Slot::User2 => &self.user2,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        match slot {
            Slot::User1 => &mut self.user1,
            Slot::User2 => &mut self.user2,
        }
    }
}

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}
