// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed document bodies and path builders for the document store.
//!
//! Paths and wire field names (camelCase timestamps, the Portuguese
//! `perguntas`/`respostas`) are fixed by the existing question generator
//! and report producer, so serde renames pin them explicitly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{SessionStatus, Slot};

/// Path of a session document: `dilemmas/{code}`.
pub fn session_path(code: &str) -> String {
    format!("dilemmas/{code}")
}

/// Path of a participant document: `dilemmas/{code}/users/{slot}`.
pub fn participant_path(code: &str, slot: Slot) -> String {
    format!("dilemmas/{code}/users/{slot}")
}

/// Path of a context question set: `dilemmas/{code}/context_questions/{slot}`.
pub fn context_questions_path(code: &str, slot: Slot) -> String {
    format!("dilemmas/{code}/context_questions/{slot}")
}

/// Path of a main question set: `dilemmas/{code}/main_questions/{slot}`.
pub fn main_questions_path(code: &str, slot: Slot) -> String {
    format!("dilemmas/{code}/main_questions/{slot}")
}

/// Path of a main answer set: `dilemmas/{code}/main_answers/{slot}`.
pub fn main_answers_path(code: &str, slot: Slot) -> String {
    format!("dilemmas/{code}/main_answers/{slot}")
}

/// Path of a report document: `reports/{code}`.
pub fn report_path(code: &str) -> String {
    format!("reports/{code}")
}

/// Extract the session code from any path under `dilemmas/`.
///
/// Returns `None` for paths outside the session tree (e.g. `reports/…`).
pub fn session_code_of(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("dilemmas/")?;
    let code = rest.split('/').next()?;
    if code.is_empty() { None } else { Some(code) }
}

/// The session document at `dilemmas/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDoc {
    /// The dilemma title both participants are working through.
    pub title: String,
    /// ISO 8601 creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Lifecycle status; advances monotonically.
    pub status: SessionStatus,
    /// Set when user2 enters; gates context question generation.
    #[serde(default)]
    pub ready_for_context_questions: bool,
    /// One-time claim flag for context question generation.
    #[serde(default)]
    pub context_questions_generated: bool,
}

/// A participant document at `dilemmas/{code}/users/{slot}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDoc {
    pub name: String,
    pub intro: String,
    /// ISO 8601 entry timestamp.
    #[serde(rename = "joinedAt")]
    pub joined_at: String,
}

/// A context question set at `dilemmas/{code}/context_questions/{slot}`.
///
/// `respostas` is absent until the participant submits, then holds one
/// answer per question, index-aligned with `perguntas`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextQuestionsDoc {
    pub perguntas: Vec<String>,
    #[serde(default)]
    pub respostas: Vec<String>,
}

/// A main question set at `dilemmas/{code}/main_questions/{slot}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainQuestionsDoc {
    pub perguntas: Vec<String>,
}

/// A main answer set at `dilemmas/{code}/main_answers/{slot}`.
///
/// Written once, in full; entries are either real answers or the
/// unanswered sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainAnswersDoc {
    pub respostas: Vec<String>,
}

/// The report document at `reports/{code}`, produced externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDoc {
    #[serde(rename = "dilemmaTitle")]
    pub dilemma_title: String,
    pub user1: ReportParticipant,
    pub user2: ReportParticipant,
    pub analysis: ReportAnalysis,
}

/// One participant's block inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportParticipant {
    pub name: String,
    pub intro: String,
    #[serde(rename = "mainQuestions")]
    pub main_questions: Vec<String>,
    #[serde(rename = "mainAnswers")]
    pub main_answers: Vec<String>,
}

/// The analysis block inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAnalysis {
    pub summary: String,
    pub agreements: Vec<String>,
    pub conflicts: Vec<String>,
    pub patterns: Vec<String>,
    pub insights: Vec<String>,
    #[serde(rename = "finalRecommendation")]
    pub final_recommendation: String,
}

/// Shallow-merge `patch` into `base`, field by field.
///
/// Non-object patches (or a non-object base) replace the base entirely,
/// matching set-with-merge semantics for top-level fields.
pub fn merge_values(base: &mut Value, patch: Value) {
    match (base.as_object_mut(), patch) {
        (Some(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                base_map.insert(key, value);
            }
        }
        (_, patch) => *base = patch,
    }
}
