// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dueto report` command implementation.
//!
//! Fetches the externally produced comparison report and renders it to
//! the terminal.

use colored::Colorize;

use dueto_config::DuetoConfig;
use dueto_core::documents::{ReportDoc, ReportParticipant};
use dueto_core::types::UNANSWERED;
use dueto_core::{DuetoError, SessionCode};

use crate::client::GatewayClient;

/// Runs the `dueto report` command.
pub async fn run_report(config: DuetoConfig, code: &str) -> Result<(), DuetoError> {
    let code = SessionCode::parse(code)?;
    let client = GatewayClient::new(&config.client.gateway_url)?;

    match client.report(&code).await? {
        Some(report) => {
            render_report(&report);
            Ok(())
        }
        None => Err(DuetoError::NotFound {
            path: format!("reports/{code}"),
        }),
    }
}

/// Render a report to stdout.
pub fn render_report(report: &ReportDoc) {
    println!();
    println!("{}", report.dilemma_title.bold().underline());
    println!();
    println!("{}", "Summary".bold());
    println!("{}", report.analysis.summary);

    render_list("Agreements", &report.analysis.agreements, |s| s.green());
    render_list("Conflicts", &report.analysis.conflicts, |s| s.red());
    render_list("Patterns", &report.analysis.patterns, |s| s.normal());
    render_list("Insights", &report.analysis.insights, |s| s.cyan());

    println!();
    println!("{}", "Recommendation".bold());
    println!("{}", report.analysis.final_recommendation.bold());

    render_participant(&report.user1);
    render_participant(&report.user2);
}

fn render_list(
    title: &str,
    items: &[String],
    paint: impl Fn(&str) -> colored::ColoredString,
) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}", title.bold());
    for item in items {
        println!("  - {}", paint(item));
    }
}

fn render_participant(participant: &ReportParticipant) {
    println!();
    println!("{}", format!("{}'s answers", participant.name).bold());
    for (question, answer) in participant
        .main_questions
        .iter()
        .zip(&participant.main_answers)
    {
        println!("  {}", question.dimmed());
        if answer == UNANSWERED {
            println!("    {}", answer.italic().dimmed());
        } else {
            println!("    {answer}");
        }
    }
}
