// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! All errors come back as `{"error": "..."}`. An invalid or unknown
//! session code and an invalid slot both resolve to 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use dueto_core::documents::{
    self, ContextQuestionsDoc, MainAnswersDoc, MainQuestionsDoc, ParticipantDoc, SessionDoc,
};
use dueto_core::types::{ANSWER_MAX_CHARS, INTRO_MAX_CHARS, NAME_MAX_CHARS, TITLE_MAX_CHARS};
use dueto_core::{
    get_typed, DuetoError, HealthStatus, SessionCode, SessionStatus, Slot,
};
use dueto_session::{SessionSnapshot, Stage};

use crate::server::AppState;

/// Attempts at a fresh code when creation collides with an existing one.
const CODE_RETRIES: usize = 3;

/// Request body for POST /v1/dilemmas.
#[derive(Debug, Deserialize)]
pub struct CreateDilemmaRequest {
    /// Dilemma title.
    pub title: String,
    /// Creator's display name.
    pub name: String,
    /// Creator's self introduction.
    pub intro: String,
}

/// Response body for POST /v1/dilemmas.
#[derive(Debug, Serialize)]
pub struct CreateDilemmaResponse {
    /// Shareable session code.
    pub code: String,
    /// Initial session status.
    pub status: SessionStatus,
}

/// Request body for POST /v1/dilemmas/{code}/entry.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    /// Display name.
    pub name: String,
    /// Self introduction.
    pub intro: String,
}

/// Response body for POST /v1/dilemmas/{code}/entry.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// The slot that was entered.
    pub user: Slot,
}

/// Request body for answer submissions.
#[derive(Debug, Deserialize)]
pub struct AnswersRequest {
    /// One answer per question, index-aligned.
    pub respostas: Vec<String>,
}

/// Per-slot view of a session for GET /v1/dilemmas/{code}/view.
#[derive(Debug, Serialize)]
pub struct ViewResponse {
    /// Derived stage for the requesting slot.
    pub stage: Stage,
    /// The session document.
    pub session: SessionDoc,
    /// The requesting slot's participant document, once entered.
    pub participant: Option<ParticipantDoc>,
    /// Whether the partner slot has entered.
    pub partner_joined: bool,
    /// Partner's display name, once entered.
    pub partner_name: Option<String>,
    /// This slot's context questions, once generated.
    pub context_questions: Option<ContextQuestionsDoc>,
    /// This slot's main questions, once generated.
    pub main_questions: Option<MainQuestionsDoc>,
    /// Whether this slot has already submitted its main answers.
    pub main_answers_submitted: bool,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(e: DuetoError) -> Response {
    error!(error = %e, "request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

/// Validates a text field: non-empty after trimming, within the limit.
fn check_field(value: &str, max_chars: usize, field: &str) -> Result<(), Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("{field} must not be empty"),
        ));
    }
    if trimmed.chars().count() > max_chars {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("{field} must be at most {max_chars} characters"),
        ));
    }
    Ok(())
}

/// Validates an answer list against its question list and returns the
/// trimmed answers.
fn check_answers(respostas: &[String], question_count: usize) -> Result<Vec<String>, Response> {
    if respostas.len() != question_count {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("expected {question_count} answers, got {}", respostas.len()),
        ));
    }
    let mut trimmed = Vec::with_capacity(respostas.len());
    for (i, answer) in respostas.iter().enumerate() {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("answer {} must not be empty", i + 1),
            ));
        }
        if answer.chars().count() > ANSWER_MAX_CHARS {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("answer {} must be at most {ANSWER_MAX_CHARS} characters", i + 1),
            ));
        }
        trimmed.push(answer.to_string());
    }
    Ok(trimmed)
}

/// `?user=` query parameter.
#[derive(Debug, Deserialize)]
pub struct UserParam {
    user: String,
}

impl UserParam {
    /// An unknown slot resolves to 404, same as an unknown code.
    fn slot(&self) -> Result<Slot, Response> {
        self.user.parse().map_err(|_| not_found())
    }
}

fn parse_code(code: &str) -> Result<SessionCode, Response> {
    SessionCode::parse(code).map_err(|_| not_found())
}

/// POST /v1/dilemmas
///
/// Creates the session document and the creator's participant document,
/// retrying fresh codes if generation collides with an existing session.
pub async fn create_dilemma(
    State(state): State<AppState>,
    Json(body): Json<CreateDilemmaRequest>,
) -> Response {
    for (value, max, field) in [
        (&body.title, TITLE_MAX_CHARS, "title"),
        (&body.name, NAME_MAX_CHARS, "name"),
        (&body.intro, INTRO_MAX_CHARS, "intro"),
    ] {
        if let Err(response) = check_field(value, max, field) {
            return response;
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let session = json!({
        "title": body.title.trim(),
        "createdAt": now,
        "status": SessionStatus::WaitingForUser2,
        "ready_for_context_questions": false,
        "context_questions_generated": false,
    });

    let mut code = None;
    for _ in 0..CODE_RETRIES {
        let candidate = SessionCode::generate();
        match state
            .store
            .create(&documents::session_path(candidate.as_str()), session.clone())
            .await
        {
            Ok(true) => {
                code = Some(candidate);
                break;
            }
            Ok(false) => continue,
            Err(e) => return internal_error(e),
        }
    }
    let Some(code) = code else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "could not allocate a session code",
        );
    };

    let participant = json!({
        "name": body.name.trim(),
        "intro": body.intro.trim(),
        "joinedAt": now,
    });
    if let Err(e) = state
        .store
        .set(
            &documents::participant_path(code.as_str(), Slot::User1),
            participant,
        )
        .await
    {
        return internal_error(e);
    }

    info!(code = %code, "dilemma created");
    (
        StatusCode::CREATED,
        Json(CreateDilemmaResponse {
            code: code.as_str().to_string(),
            status: SessionStatus::WaitingForUser2,
        }),
    )
        .into_response()
}

/// GET /v1/dilemmas/{code}
pub async fn get_dilemma(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match get_typed::<SessionDoc>(state.store.as_ref(), &documents::session_path(code.as_str()))
        .await
    {
        Ok(Some(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// GET /v1/dilemmas/{code}/view?user={slot}
///
/// The derived stage plus the documents that stage needs, from this
/// slot's point of view.
pub async fn get_view(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<UserParam>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    let slot = match params.slot() {
        Ok(slot) => slot,
        Err(response) => return response,
    };

    let snapshot = match SessionSnapshot::load(state.store.as_ref(), &code).await {
        Ok(snapshot) => snapshot,
        Err(e) => return internal_error(e),
    };
    let Some(session) = snapshot.session.clone() else {
        return not_found();
    };

    let partner = snapshot.participants.get(slot.partner());
    let view = ViewResponse {
        stage: snapshot.stage_for(slot),
        session,
        participant: snapshot.participants.get(slot).clone(),
        partner_joined: partner.is_some(),
        partner_name: partner.as_ref().map(|p| p.name.clone()),
        context_questions: snapshot.context_questions.get(slot).clone(),
        main_questions: snapshot.main_questions.get(slot).clone(),
        main_answers_submitted: snapshot.main_answers.get(slot).is_some(),
    };
    (StatusCode::OK, Json(view)).into_response()
}

/// POST /v1/dilemmas/{code}/entry?user={slot}
///
/// Conditional create of the participant document; an occupied slot is
/// a conflict. When user2 enters, the session is flagged ready for
/// context question generation.
pub async fn post_entry(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<UserParam>,
    Json(body): Json<EntryRequest>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    let slot = match params.slot() {
        Ok(slot) => slot,
        Err(response) => return response,
    };
    for (value, max, field) in [
        (&body.name, NAME_MAX_CHARS, "name"),
        (&body.intro, INTRO_MAX_CHARS, "intro"),
    ] {
        if let Err(response) = check_field(value, max, field) {
            return response;
        }
    }

    match state
        .store
        .get(&documents::session_path(code.as_str()))
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(e) => return internal_error(e),
    }

    let participant = json!({
        "name": body.name.trim(),
        "intro": body.intro.trim(),
        "joinedAt": chrono::Utc::now().to_rfc3339(),
    });
    match state
        .store
        .create(
            &documents::participant_path(code.as_str(), slot),
            participant,
        )
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return error_response(StatusCode::CONFLICT, "slot already taken");
        }
        Err(e) => return internal_error(e),
    }

    if slot == Slot::User2 {
        // Pairing complete: open the context round.
        let patch = json!({
            "ready_for_context_questions": true,
            "status": SessionStatus::WaitingForContextAnswers,
        });
        if let Err(e) = state
            .store
            .merge(&documents::session_path(code.as_str()), patch)
            .await
        {
            return internal_error(e);
        }
    }

    info!(code = %code, %slot, "participant entered");
    (StatusCode::CREATED, Json(EntryResponse { user: slot })).into_response()
}

/// POST /v1/dilemmas/{code}/context-answers?user={slot}
///
/// One-shot submission of every context answer for this slot.
pub async fn post_context_answers(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<UserParam>,
    Json(body): Json<AnswersRequest>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    let slot = match params.slot() {
        Ok(slot) => slot,
        Err(response) => return response,
    };

    let path = documents::context_questions_path(code.as_str(), slot);
    let mut round = match get_typed::<ContextQuestionsDoc>(state.store.as_ref(), &path).await {
        Ok(Some(round)) => round,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "context questions not generated yet");
        }
        Err(e) => return internal_error(e),
    };
    if !round.respostas.is_empty() {
        return error_response(StatusCode::CONFLICT, "context answers already submitted");
    }

    let answers = match check_answers(&body.respostas, round.perguntas.len()) {
        Ok(answers) => answers,
        Err(response) => return response,
    };

    if let Err(e) = state
        .store
        .merge(&path, json!({ "respostas": answers }))
        .await
    {
        return internal_error(e);
    }

    info!(code = %code, %slot, "context answers submitted");
    round.respostas = answers;
    (StatusCode::OK, Json(round)).into_response()
}

/// POST /v1/dilemmas/{code}/main-answers?user={slot}
///
/// One-shot finalization of the main answer set. The timeout sentinel
/// counts as an answer; resubmission is a conflict.
pub async fn post_main_answers(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<UserParam>,
    Json(body): Json<AnswersRequest>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    let slot = match params.slot() {
        Ok(slot) => slot,
        Err(response) => return response,
    };

    let questions = match get_typed::<MainQuestionsDoc>(
        state.store.as_ref(),
        &documents::main_questions_path(code.as_str(), slot),
    )
    .await
    {
        Ok(Some(questions)) => questions,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "main questions not generated yet");
        }
        Err(e) => return internal_error(e),
    };

    let answers = match check_answers(&body.respostas, questions.perguntas.len()) {
        Ok(answers) => answers,
        Err(response) => return response,
    };

    match state
        .store
        .create(
            &documents::main_answers_path(code.as_str(), slot),
            json!({ "respostas": answers }),
        )
        .await
    {
        Ok(true) => {
            info!(code = %code, %slot, "main answers submitted");
            (
                StatusCode::CREATED,
                Json(MainAnswersDoc { respostas: answers }),
            )
                .into_response()
        }
        Ok(false) => error_response(StatusCode::CONFLICT, "main answers already submitted"),
        Err(e) => internal_error(e),
    }
}

/// GET /v1/reports/{code}
///
/// The report is written by the external analysis flow; it is served
/// as-is.
pub async fn get_report(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let code = match parse_code(&code) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match state
        .store
        .get(&documents::report_path(code.as_str()))
        .await
    {
        Ok(Some(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "report not ready"),
        Err(e) => internal_error(e),
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Response {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, Json(health)).into_response(),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, reason)
        }
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_deserializes() {
        let json = r#"{"title": "Mudar de cidade?", "name": "Ana", "intro": "Oi"}"#;
        let req: CreateDilemmaRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.title, "Mudar de cidade?");
        assert_eq!(req.name, "Ana");
    }

    #[test]
    fn create_response_serializes_status_string() {
        let resp = CreateDilemmaResponse {
            code: "AB2CDEF".to_string(),
            status: SessionStatus::WaitingForUser2,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"code\":\"AB2CDEF\""));
        assert!(json.contains("\"status\":\"waiting_for_user2\""));
    }

    #[test]
    fn answers_request_deserializes() {
        let json = r#"{"respostas": ["a", "b"]}"#;
        let req: AnswersRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.respostas.len(), 2);
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "slot already taken".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("slot already taken"));
    }

    #[test]
    fn view_response_serializes_stage() {
        let view = ViewResponse {
            stage: Stage::AwaitingPartner,
            session: SessionDoc {
                title: "t".into(),
                created_at: "2026-01-10T12:00:00Z".into(),
                status: SessionStatus::WaitingForUser2,
                ready_for_context_questions: false,
                context_questions_generated: false,
            },
            participant: None,
            partner_joined: false,
            partner_name: None,
            context_questions: None,
            main_questions: None,
            main_answers_submitted: false,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["stage"], "awaiting_partner");
        assert_eq!(json["partner_joined"], false);
        assert_eq!(json["session"]["createdAt"], "2026-01-10T12:00:00Z");
    }

    #[test]
    fn check_field_rejects_blank_and_overlong() {
        assert!(check_field("Ana", NAME_MAX_CHARS, "name").is_ok());
        assert!(check_field("   ", NAME_MAX_CHARS, "name").is_err());
        let long = "x".repeat(NAME_MAX_CHARS + 1);
        assert!(check_field(&long, NAME_MAX_CHARS, "name").is_err());
        // Limits are in characters, not bytes.
        let accented = "á".repeat(NAME_MAX_CHARS);
        assert!(check_field(&accented, NAME_MAX_CHARS, "name").is_ok());
    }

    #[test]
    fn check_answers_trims_and_validates() {
        let answers = vec!["  primeira  ".to_string(), "segunda".to_string()];
        let trimmed = check_answers(&answers, 2).unwrap();
        assert_eq!(trimmed, vec!["primeira", "segunda"]);

        assert!(check_answers(&answers, 3).is_err());
        assert!(check_answers(&["".to_string()], 1).is_err());
        assert!(check_answers(&["x".repeat(ANSWER_MAX_CHARS + 1)], 1).is_err());
    }

    #[test]
    fn user_param_rejects_unknown_slot() {
        let param = UserParam {
            user: "user3".into(),
        };
        assert!(param.slot().is_err());
        let param = UserParam {
            user: "user2".into(),
        };
        assert_eq!(param.slot().unwrap(), Slot::User2);
    }
}
