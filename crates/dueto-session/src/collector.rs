// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timed collection of main-question answers.
//!
//! Each question gets a fixed response budget. The countdown is owned by
//! an [`AnswerTimer`] value carrying its question index; moving to a
//! different index drops the old timer and starts a fresh one, so a
//! stale countdown can never fire for the wrong question.

use std::time::Duration;

use dueto_core::types::UNANSWERED;

use crate::draft::MainDraft;

/// Urgency of the remaining time, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerBand {
    /// More than 120 seconds left.
    Plenty,
    /// 120 seconds or less.
    Waning,
    /// 60 seconds or less.
    Short,
    /// 30 seconds or less.
    Critical,
}

/// Countdown for a single question index.
#[derive(Debug)]
pub struct AnswerTimer {
    index: usize,
    deadline: tokio::time::Instant,
}

impl AnswerTimer {
    /// Start a fresh full-length countdown for `index`.
    pub fn start(index: usize, duration: Duration) -> Self {
        Self {
            index,
            deadline: tokio::time::Instant::now() + duration,
        }
    }

    /// The question index this countdown belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.deadline
            .saturating_duration_since(tokio::time::Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Completes when the countdown reaches zero.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }

    pub fn band(&self) -> TimerBand {
        band_for(self.remaining())
    }
}

/// Classify remaining time into a display band.
pub fn band_for(remaining: Duration) -> TimerBand {
    if remaining > Duration::from_secs(120) {
        TimerBand::Plenty
    } else if remaining > Duration::from_secs(60) {
        TimerBand::Waning
    } else if remaining > Duration::from_secs(30) {
        TimerBand::Short
    } else {
        TimerBand::Critical
    }
}

/// Outcome of submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Moved on to the next question.
    Advanced,
    /// That was the last question; the answer set is complete.
    Finished,
}

/// Walks a participant through their main questions under the countdown.
///
/// The collector tracks the answer sequence and current step; the caller
/// drives it from user input and [`AnswerTimer::expired`], and persists
/// [`AnswerCollector::draft`] snapshots between changes.
#[derive(Debug)]
pub struct AnswerCollector {
    questions: Vec<String>,
    answers: Vec<String>,
    step: usize,
    duration: Duration,
    timer: AnswerTimer,
}

impl AnswerCollector {
    /// Start at the first question with empty answers.
    pub fn new(questions: Vec<String>, duration: Duration) -> Self {
        Self {
            answers: vec![String::new(); questions.len()],
            timer: AnswerTimer::start(0, duration),
            step: 0,
            duration,
            questions,
        }
    }

    /// Resume from a saved draft.
    ///
    /// The draft's answers are padded or truncated to the question count
    /// and the step is clamped into range, so a draft written against a
    /// different question list cannot put the collector out of bounds.
    pub fn resume(questions: Vec<String>, duration: Duration, draft: MainDraft) -> Self {
        let mut answers = draft.respostas;
        answers.resize(questions.len(), String::new());
        let step = draft.step.min(questions.len().saturating_sub(1));
        Self {
            answers,
            timer: AnswerTimer::start(step, duration),
            step,
            duration,
            questions,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_question(&self) -> &str {
        &self.questions[self.step]
    }

    pub fn current_answer(&self) -> &str {
        &self.answers[self.step]
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    /// The countdown for the current question.
    pub fn timer(&self) -> &AnswerTimer {
        &self.timer
    }

    /// Record an answer for the current question and advance.
    pub fn submit(&mut self, answer: String) -> Progress {
        if self.questions.is_empty() {
            return Progress::Finished;
        }
        self.answers[self.step] = answer;
        if self.step + 1 < self.questions.len() {
            self.step += 1;
            self.timer = AnswerTimer::start(self.step, self.duration);
            Progress::Advanced
        } else {
            Progress::Finished
        }
    }

    /// The countdown ran out: submit the sentinel through the same path
    /// as a typed answer.
    pub fn expire(&mut self) -> Progress {
        self.submit(UNANSWERED.to_string())
    }

    /// Step back to the previous question, restarting its countdown.
    /// Returns false at the first question.
    pub fn back(&mut self) -> bool {
        if self.step == 0 {
            return false;
        }
        self.step -= 1;
        self.timer = AnswerTimer::start(self.step, self.duration);
        true
    }

    /// Snapshot for the draft cache.
    pub fn draft(&self) -> MainDraft {
        MainDraft {
            respostas: self.answers.clone(),
            step: self.step,
        }
    }

    /// Consume the collector after [`Progress::Finished`].
    pub fn into_answers(self) -> Vec<String> {
        self.answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: Duration = Duration::from_secs(240);

    fn questions(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Pergunta {i}")).collect()
    }

    #[test]
    fn band_thresholds() {
        assert_eq!(band_for(Duration::from_secs(240)), TimerBand::Plenty);
        assert_eq!(band_for(Duration::from_secs(121)), TimerBand::Plenty);
        assert_eq!(band_for(Duration::from_secs(120)), TimerBand::Waning);
        assert_eq!(band_for(Duration::from_secs(61)), TimerBand::Waning);
        assert_eq!(band_for(Duration::from_secs(60)), TimerBand::Short);
        assert_eq!(band_for(Duration::from_secs(31)), TimerBand::Short);
        assert_eq!(band_for(Duration::from_secs(30)), TimerBand::Critical);
        assert_eq!(band_for(Duration::ZERO), TimerBand::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn collector_walks_through_all_questions() {
        let mut collector = AnswerCollector::new(questions(3), BUDGET);
        assert_eq!(collector.step(), 0);
        assert_eq!(collector.current_question(), "Pergunta 1");

        assert_eq!(collector.submit("a".into()), Progress::Advanced);
        assert_eq!(collector.submit("b".into()), Progress::Advanced);
        assert_eq!(collector.step(), 2);
        assert_eq!(collector.submit("c".into()), Progress::Finished);

        assert_eq!(collector.into_answers(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn submitting_restarts_the_countdown() {
        let mut collector = AnswerCollector::new(questions(2), BUDGET);

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(collector.timer().band(), TimerBand::Critical);

        collector.submit("a".into());
        assert_eq!(collector.timer().index(), 1);
        assert_eq!(collector.timer().remaining(), BUDGET);
        assert_eq!(collector.timer().band(), TimerBand::Plenty);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_the_sentinel() {
        let mut collector = AnswerCollector::new(questions(2), BUDGET);

        collector.timer().expired().await;
        assert!(collector.timer().is_expired());
        assert_eq!(collector.expire(), Progress::Advanced);
        assert_eq!(collector.answers()[0], UNANSWERED);

        // The next question starts with a fresh budget.
        assert_eq!(collector.timer().remaining(), BUDGET);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_on_last_question_finishes_the_set() {
        let mut collector = AnswerCollector::new(questions(1), BUDGET);
        collector.timer().expired().await;
        assert_eq!(collector.expire(), Progress::Finished);
        assert_eq!(collector.into_answers(), vec![UNANSWERED.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn back_revisits_with_a_fresh_countdown() {
        let mut collector = AnswerCollector::new(questions(3), BUDGET);
        collector.submit("a".into());
        tokio::time::advance(Duration::from_secs(100)).await;

        assert!(collector.back());
        assert_eq!(collector.step(), 0);
        assert_eq!(collector.current_answer(), "a");
        assert_eq!(collector.timer().remaining(), BUDGET);

        // Resubmitting moves forward again without losing later answers.
        assert_eq!(collector.submit("a2".into()), Progress::Advanced);
        assert_eq!(collector.submit("b".into()), Progress::Advanced);
        assert_eq!(collector.submit("c".into()), Progress::Finished);
        assert_eq!(collector.into_answers(), vec!["a2", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn back_stops_at_the_first_question() {
        let mut collector = AnswerCollector::new(questions(2), BUDGET);
        assert!(!collector.back());
        assert_eq!(collector.step(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_picks_up_where_the_draft_left_off() {
        let draft = MainDraft {
            respostas: vec!["a".into(), "b".into(), String::new()],
            step: 2,
        };
        let collector = AnswerCollector::resume(questions(3), BUDGET, draft);
        assert_eq!(collector.step(), 2);
        assert_eq!(collector.answers()[0], "a");
        assert_eq!(collector.timer().index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_clamps_out_of_range_drafts() {
        let draft = MainDraft {
            respostas: vec!["a".into()],
            step: 99,
        };
        let collector = AnswerCollector::resume(questions(3), BUDGET, draft);
        assert_eq!(collector.step(), 2);
        assert_eq!(collector.answers().len(), 3);
        assert_eq!(collector.answers()[0], "a");
        assert_eq!(collector.answers()[2], "");
    }

    #[tokio::test(start_paused = true)]
    async fn draft_snapshot_tracks_progress() {
        let mut collector = AnswerCollector::new(questions(3), BUDGET);
        collector.submit("a".into());

        let draft = collector.draft();
        assert_eq!(draft.step, 1);
        assert_eq!(draft.respostas, vec!["a".to_string(), String::new(), String::new()]);
    }
}
