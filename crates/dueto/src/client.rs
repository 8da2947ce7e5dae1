// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dueto create` and `dueto join` command implementations.
//!
//! The terminal counterpart of the original's pages: `create` runs the
//! entry form for the session creator and prints the share links, `join`
//! drives the session view for one slot, polling the gateway, prompting
//! at the interactive stages and running the timed main-question
//! sequence with local draft resume.

use std::io::Write as _;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use dueto_config::DuetoConfig;
use dueto_core::documents::{ContextQuestionsDoc, MainQuestionsDoc, ReportDoc, SessionDoc};
use dueto_core::types::{
    ANSWER_MAX_CHARS, INTRO_MAX_CHARS, NAME_MAX_CHARS, TITLE_MAX_CHARS,
};
use dueto_core::{DuetoError, SessionCode, Slot};
use dueto_session::{AnswerCollector, DraftStore, Progress, TimerBand};

use crate::report::render_report;

/// How often the join loop re-reads the view while waiting.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Buffered stdin line reader shared by every prompt.
type StdinLines = Lines<BufReader<Stdin>>;

fn stdin_lines() -> StdinLines {
    BufReader::new(tokio::io::stdin()).lines()
}

/// The per-slot view served by the gateway.
#[derive(Debug, Deserialize)]
struct View {
    stage: dueto_session::Stage,
    session: SessionDoc,
    partner_name: Option<String>,
    context_questions: Option<ContextQuestionsDoc>,
    main_questions: Option<MainQuestionsDoc>,
    main_answers_submitted: bool,
}

/// HTTP client for the gateway REST API.
pub struct GatewayClient {
    http: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct CreatedDilemma {
    code: String,
}

impl GatewayClient {
    pub fn new(base: &str) -> Result<Self, DuetoError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DuetoError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Decode a response, converting non-2xx bodies into gateway errors.
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DuetoError> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| DuetoError::Gateway {
                message: format!("malformed gateway response: {e}"),
                source: Some(Box::new(e)),
            });
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("gateway returned {status}"),
        };
        Err(DuetoError::Gateway {
            message,
            source: None,
        })
    }

    fn send_err(e: reqwest::Error) -> DuetoError {
        DuetoError::Gateway {
            message: format!("gateway unreachable: {e}"),
            source: Some(Box::new(e)),
        }
    }

    async fn create_dilemma(
        &self,
        title: &str,
        name: &str,
        intro: &str,
    ) -> Result<CreatedDilemma, DuetoError> {
        let response = self
            .http
            .post(format!("{}/v1/dilemmas", self.base))
            .json(&serde_json::json!({"title": title, "name": name, "intro": intro}))
            .send()
            .await
            .map_err(Self::send_err)?;
        Self::decode(response).await
    }

    async fn view(&self, code: &SessionCode, slot: Slot) -> Result<View, DuetoError> {
        let response = self
            .http
            .get(format!("{}/v1/dilemmas/{code}/view?user={slot}", self.base))
            .send()
            .await
            .map_err(Self::send_err)?;
        Self::decode(response).await
    }

    async fn enter(
        &self,
        code: &SessionCode,
        slot: Slot,
        name: &str,
        intro: &str,
    ) -> Result<(), DuetoError> {
        let response = self
            .http
            .post(format!("{}/v1/dilemmas/{code}/entry?user={slot}", self.base))
            .json(&serde_json::json!({"name": name, "intro": intro}))
            .send()
            .await
            .map_err(Self::send_err)?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn submit_context_answers(
        &self,
        code: &SessionCode,
        slot: Slot,
        respostas: &[String],
    ) -> Result<(), DuetoError> {
        let response = self
            .http
            .post(format!(
                "{}/v1/dilemmas/{code}/context-answers?user={slot}",
                self.base
            ))
            .json(&serde_json::json!({"respostas": respostas}))
            .send()
            .await
            .map_err(Self::send_err)?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn submit_main_answers(
        &self,
        code: &SessionCode,
        slot: Slot,
        respostas: &[String],
    ) -> Result<(), DuetoError> {
        let response = self
            .http
            .post(format!(
                "{}/v1/dilemmas/{code}/main-answers?user={slot}",
                self.base
            ))
            .json(&serde_json::json!({"respostas": respostas}))
            .send()
            .await
            .map_err(Self::send_err)?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// The report, once the external analysis has produced it.
    pub async fn report(&self, code: &SessionCode) -> Result<Option<ReportDoc>, DuetoError> {
        let response = self
            .http
            .get(format!("{}/v1/reports/{code}", self.base))
            .send()
            .await
            .map_err(Self::send_err)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::decode(response).await?))
    }
}

/// Runs the `dueto create` command.
pub async fn run_create(config: DuetoConfig) -> Result<(), DuetoError> {
    let client = GatewayClient::new(&config.client.gateway_url)?;
    let mut lines = stdin_lines();

    println!("{}", "Create a new dilemma".bold());
    let title = prompt_field(&mut lines, "Dilemma title", TITLE_MAX_CHARS).await?;
    let name = prompt_field(&mut lines, "Your name", NAME_MAX_CHARS).await?;
    let intro = prompt_field(&mut lines, "A short introduction", INTRO_MAX_CHARS).await?;

    let created = client.create_dilemma(&title, &name, &intro).await?;
    println!();
    println!("Session code: {}", created.code.bold().green());
    println!(
        "Your link:    {}/dilemma/{}?user=user1",
        config.client.gateway_url, created.code
    );
    println!(
        "Partner link: {}/dilemma/{}?user=user2",
        config.client.gateway_url, created.code
    );
    println!();
    println!("Continue with: dueto join {} --user user1", created.code);
    Ok(())
}

/// Runs the `dueto join` command: the session view loop for one slot.
pub async fn run_join(config: DuetoConfig, code: &str, slot: Slot) -> Result<(), DuetoError> {
    let code = SessionCode::parse(code)?;
    let client = GatewayClient::new(&config.client.gateway_url)?;
    let drafts = DraftStore::new(config.client.draft_dir.clone());
    let budget = Duration::from_secs(config.session.answer_timer_secs);
    let mut lines = stdin_lines();

    let mut view = client.view(&code, slot).await?;
    println!(
        "{} {} ({slot})",
        "Dilemma:".bold(),
        view.session.title.bold()
    );

    loop {
        use dueto_session::Stage::*;
        match view.stage {
            AwaitingEntry => {
                println!("{}", "Enter the session".bold());
                let name = prompt_field(&mut lines, "Your name", NAME_MAX_CHARS).await?;
                let intro =
                    prompt_field(&mut lines, "A short introduction", INTRO_MAX_CHARS).await?;
                client.enter(&code, slot, &name, &intro).await?;
                view = client.view(&code, slot).await?;
            }
            AwaitingPartner => {
                view = wait_while(&client, &code, slot, view.stage, "Waiting for your partner to join...").await?;
                if let Some(partner) = &view.partner_name {
                    println!("{} joined.", partner.bold());
                }
            }
            GeneratingContextQuestions => {
                view = wait_while(&client, &code, slot, view.stage, "Generating your context questions...").await?;
            }
            AnsweringContextQuestions => {
                let round = view.context_questions.take().ok_or_else(|| {
                    DuetoError::Internal("answering stage without context questions".into())
                })?;
                let answers = collect_context_answers(&mut lines, &round).await?;
                client.submit_context_answers(&code, slot, &answers).await?;
                println!("{}", "Context answers submitted.".green());
                view = client.view(&code, slot).await?;
            }
            AwaitingContextPartner => {
                view = wait_while(&client, &code, slot, view.stage, "Waiting for your partner's context answers...").await?;
            }
            GeneratingMainQuestions => {
                view = wait_while(&client, &code, slot, view.stage, "Generating the main questions...").await?;
            }
            AnsweringMainQuestions => {
                let round = view.main_questions.take().ok_or_else(|| {
                    DuetoError::Internal("answering stage without main questions".into())
                })?;
                let answers =
                    run_main_sequence(&mut lines, &drafts, &code, slot, round.perguntas, budget)
                        .await?;
                client.submit_main_answers(&code, slot, &answers).await?;
                drafts.clear(code.as_str(), slot).await?;
                println!("{}", "All main answers submitted.".green());
                view = client.view(&code, slot).await?;
            }
            AwaitingMainPartner => {
                if view.main_answers_submitted {
                    println!("{}", "Your answers are in.".dimmed());
                }
                if let Some(report) = wait_for_report(&client, &code).await? {
                    render_report(&report);
                }
                return Ok(());
            }
        }
    }
}

/// Prompt until a non-empty value within `max_chars` is entered.
async fn prompt_field(
    lines: &mut StdinLines,
    label: &str,
    max_chars: usize,
) -> Result<String, DuetoError> {
    loop {
        let value = prompt_line(lines, label).await?;
        let value = value.trim();
        if value.is_empty() {
            println!("{}", "A value is required.".yellow());
            continue;
        }
        if value.chars().count() > max_chars {
            println!("{}", format!("At most {max_chars} characters.").yellow());
            continue;
        }
        return Ok(value.to_string());
    }
}

async fn prompt_line(lines: &mut StdinLines, label: &str) -> Result<String, DuetoError> {
    print!("{} ", format!("{label}:").cyan());
    std::io::stdout()
        .flush()
        .map_err(|e| DuetoError::Internal(format!("stdout flush failed: {e}")))?;
    match lines.next_line().await {
        Ok(Some(line)) => Ok(line),
        Ok(None) => Err(DuetoError::Internal("stdin closed".into())),
        Err(e) => Err(DuetoError::Internal(format!("stdin read failed: {e}"))),
    }
}

/// Poll the view with a spinner until the stage moves off `current`.
async fn wait_while(
    client: &GatewayClient,
    code: &SessionCode,
    slot: Slot,
    current: dueto_session::Stage,
    message: &str,
) -> Result<View, DuetoError> {
    let spinner = spinner(message);
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let view = client.view(code, slot).await?;
        if view.stage != current {
            spinner.finish_and_clear();
            return Ok(view);
        }
    }
}

/// Poll until the externally produced report document appears.
async fn wait_for_report(
    client: &GatewayClient,
    code: &SessionCode,
) -> Result<Option<ReportDoc>, DuetoError> {
    let spinner = spinner("Waiting for the comparison report...");
    loop {
        if let Some(report) = client.report(code).await? {
            spinner.finish_and_clear();
            return Ok(Some(report));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Collect the untimed context answers, one prompt per question.
async fn collect_context_answers(
    lines: &mut StdinLines,
    round: &ContextQuestionsDoc,
) -> Result<Vec<String>, DuetoError> {
    println!();
    println!("{}", "Context questions".bold());
    let mut answers = Vec::with_capacity(round.perguntas.len());
    for (i, question) in round.perguntas.iter().enumerate() {
        println!();
        println!("{} {question}", format!("[{}/{}]", i + 1, round.perguntas.len()).dimmed());
        answers.push(prompt_field(lines, "Answer", ANSWER_MAX_CHARS).await?);
    }
    Ok(answers)
}

/// The timed main-question sequence.
///
/// Each question has a fixed response budget; expiry submits the
/// unanswered sentinel through the same path as a typed answer. `/back`
/// revisits the previous question with a fresh countdown. Every change
/// is mirrored to the draft store so a restart resumes mid-sequence.
async fn run_main_sequence(
    lines: &mut StdinLines,
    drafts: &DraftStore,
    code: &SessionCode,
    slot: Slot,
    questions: Vec<String>,
    budget: Duration,
) -> Result<Vec<String>, DuetoError> {
    let mut collector = match drafts.load(code.as_str(), slot).await {
        Some(draft) => {
            println!("{}", "Resuming your saved progress.".dimmed());
            AnswerCollector::resume(questions, budget, draft)
        }
        None => AnswerCollector::new(questions, budget),
    };

    println!();
    println!("{}", "Main questions".bold());
    println!(
        "{}",
        format!(
            "You have {} per question. Type /back to revisit the previous one.",
            format_remaining(budget)
        )
        .dimmed()
    );

    loop {
        println!();
        println!(
            "{} {}",
            format!("[{}/{}]", collector.step() + 1, collector.len()).dimmed(),
            collector.current_question()
        );
        if !collector.current_answer().is_empty() {
            println!("{}", format!("Previous answer: {}", collector.current_answer()).dimmed());
        }
        print_countdown(&collector);

        // The sleep owns its own deadline so the collector stays free to
        // mutate in the arms.
        let remaining = collector.timer().remaining();
        let progress = tokio::select! {
            _ = tokio::time::sleep(remaining) => {
                println!("{}", "Time is up, recording this question as unanswered.".red());
                collector.expire()
            }
            line = prompt_line(lines, "Answer") => {
                let line = line?;
                let answer = line.trim();
                if answer == "/back" {
                    if !collector.back() {
                        println!("{}", "Already at the first question.".yellow());
                    }
                    drafts.save(code.as_str(), slot, &collector.draft()).await?;
                    continue;
                }
                if answer.is_empty() {
                    println!("{}", "An answer is required (or wait for the timer).".yellow());
                    continue;
                }
                if answer.chars().count() > ANSWER_MAX_CHARS {
                    println!("{}", format!("At most {ANSWER_MAX_CHARS} characters.").yellow());
                    continue;
                }
                collector.submit(answer.to_string())
            }
        };

        drafts.save(code.as_str(), slot, &collector.draft()).await?;
        if progress == Progress::Finished {
            return Ok(collector.into_answers());
        }
    }
}

fn print_countdown(collector: &AnswerCollector) {
    let remaining = format_remaining(collector.timer().remaining());
    let line = format!("Time remaining: {remaining}");
    let line = match collector.timer().band() {
        TimerBand::Plenty => line.normal(),
        TimerBand::Waning => line.yellow(),
        TimerBand::Short => line.red(),
        TimerBand::Critical => line.red().bold(),
    };
    println!("{line}");
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
