// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side reconciliation of session state.
//!
//! The reconciler owns the two side-effecting transitions of the
//! session flow: context question generation and main question
//! generation. It reacts to store change events, and a periodic resync
//! sweep re-evaluates every session, which retries generation after a
//! webhook failure and recovers sessions stalled by a crash between
//! claim and completion.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use dueto_core::documents::{self, ContextQuestionsDoc};
use dueto_core::{
    DocumentStore, DuetoError, GenerationAdapter, SessionCode, SessionProfile, SessionStatus, Slot,
    SlotPair,
};

use crate::stage::SessionSnapshot;

/// Drives question generation for every session in the store.
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn GenerationAdapter>,
    context_answer_count: usize,
    resync_interval: Duration,
    /// Generation rounds with a webhook call outstanding, keyed
    /// `{code}:{round}`.
    inflight: Mutex<HashSet<String>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn GenerationAdapter>,
        context_answer_count: usize,
        resync_interval: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            context_answer_count,
            resync_interval,
            inflight: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the reconciliation loop until the cancellation token trips.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut events = self.store.subscribe();
        let mut resync = tokio::time::interval(self.resync_interval);
        info!(
            resync_secs = self.resync_interval.as_secs(),
            "reconciler running"
        );

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Some(code) = documents::session_code_of(&event.path) {
                                self.reconcile_code(code).await;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "change feed lagged, next sweep will catch up");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("change feed closed, stopping reconciler");
                            break;
                        }
                    }
                }
                // The first tick fires immediately, which doubles as
                // crash recovery at startup.
                _ = resync.tick() => {
                    if let Err(e) = self.resync().await {
                        error!(error = %e, "resync sweep failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping reconciler");
                    break;
                }
            }
        }
    }

    /// One sweep over every session in the store.
    pub async fn resync(&self) -> Result<(), DuetoError> {
        let paths = self.store.list("dilemmas/").await?;
        let mut seen = HashSet::new();
        for path in paths {
            let Some(code) = documents::session_code_of(&path) else {
                continue;
            };
            if seen.insert(code.to_string()) {
                self.reconcile_code(code).await;
            }
        }
        Ok(())
    }

    async fn reconcile_code(&self, code: &str) {
        match SessionCode::parse(code) {
            Ok(code) => {
                if let Err(e) = self.reconcile(&code).await {
                    error!(code = %code, error = %e, "reconciliation failed");
                }
            }
            Err(_) => debug!(code, "ignoring path without a session code"),
        }
    }

    /// Evaluate one session and perform whatever generation is due.
    pub async fn reconcile(&self, code: &SessionCode) -> Result<(), DuetoError> {
        let snapshot = SessionSnapshot::load(self.store.as_ref(), code).await?;
        self.maybe_generate_context(code, &snapshot).await?;
        self.maybe_generate_main(code, &snapshot).await
    }

    async fn maybe_generate_context(
        &self,
        code: &SessionCode,
        snapshot: &SessionSnapshot,
    ) -> Result<(), DuetoError> {
        let Some(session) = &snapshot.session else {
            return Ok(());
        };
        let docs_missing = snapshot.context_questions.user1.is_none()
            || snapshot.context_questions.user2.is_none();
        if !session.ready_for_context_questions || !docs_missing {
            return Ok(());
        }
        let Some(profile) = snapshot.profile(code) else {
            return Ok(());
        };

        let key = format!("{code}:context");
        if !self.begin(&key).await {
            return Ok(());
        }
        let result = self
            .generate_context(code, &profile, session.context_questions_generated)
            .await;
        self.finish(&key).await;
        result
    }

    async fn generate_context(
        &self,
        code: &SessionCode,
        profile: &SessionProfile,
        already_claimed: bool,
    ) -> Result<(), DuetoError> {
        if already_claimed {
            // Claimed but the documents never landed: a crash between
            // claim and completion. Drive the call again.
            warn!(code = %code, "re-driving stalled context generation");
        } else {
            let claimed = self
                .store
                .merge_if(
                    &documents::session_path(code.as_str()),
                    &[
                        ("ready_for_context_questions", json!(true)),
                        ("context_questions_generated", json!(false)),
                    ],
                    json!({ "context_questions_generated": true }),
                )
                .await?;
            if !claimed {
                debug!(code = %code, "context generation already claimed elsewhere");
                return Ok(());
            }
        }

        info!(code = %code, "generating context questions");
        match self.generator.context_questions(profile).await {
            Ok(questions) => {
                for slot in Slot::BOTH {
                    // Conditional create keeps a slot's existing round
                    // (and any answers on it) after a partial write.
                    let created = self
                        .store
                        .create(
                            &documents::context_questions_path(code.as_str(), slot),
                            json!({ "perguntas": questions.get(slot) }),
                        )
                        .await?;
                    if !created {
                        debug!(code = %code, %slot, "context questions already present");
                    }
                }
                Ok(())
            }
            Err(e) => {
                error!(code = %code, error = %e, "context generation failed, releasing claim");
                self.store
                    .merge(
                        &documents::session_path(code.as_str()),
                        json!({ "context_questions_generated": false }),
                    )
                    .await?;
                Err(e)
            }
        }
    }

    async fn maybe_generate_main(
        &self,
        code: &SessionCode,
        snapshot: &SessionSnapshot,
    ) -> Result<(), DuetoError> {
        let Some(session) = &snapshot.session else {
            return Ok(());
        };
        let due = match session.status {
            SessionStatus::WaitingForContextAnswers => {
                snapshot.context_answers_complete(self.context_answer_count)
            }
            // The status claims generation but the question documents
            // are missing: the call never completed. The sweep
            // re-drives it.
            SessionStatus::GeneratingMainQuestions => {
                snapshot.main_questions.user1.is_none() || snapshot.main_questions.user2.is_none()
            }
            _ => false,
        };
        if !due {
            return Ok(());
        }
        let (Some(profile), Some(context)) = (snapshot.profile(code), snapshot.context_rounds())
        else {
            return Ok(());
        };

        let key = format!("{code}:main");
        if !self.begin(&key).await {
            return Ok(());
        }
        let result = self
            .generate_main(code, &profile, &context, session.status)
            .await;
        self.finish(&key).await;
        result
    }

    async fn generate_main(
        &self,
        code: &SessionCode,
        profile: &SessionProfile,
        context: &SlotPair<ContextQuestionsDoc>,
        status: SessionStatus,
    ) -> Result<(), DuetoError> {
        if status == SessionStatus::WaitingForContextAnswers {
            let claimed = self
                .store
                .merge_if(
                    &documents::session_path(code.as_str()),
                    &[("status", json!(SessionStatus::WaitingForContextAnswers))],
                    json!({ "status": SessionStatus::GeneratingMainQuestions }),
                )
                .await?;
            if !claimed {
                debug!(code = %code, "main generation already claimed elsewhere");
                return Ok(());
            }
        } else {
            warn!(code = %code, "re-driving stalled main generation");
        }

        // From here the status never reverts; on failure the session
        // stays in generating_main_questions for the sweep to retry.
        info!(code = %code, "generating main questions");
        let questions = self.generator.main_questions(profile, context).await?;
        for slot in Slot::BOTH {
            let created = self
                .store
                .create(
                    &documents::main_questions_path(code.as_str(), slot),
                    json!({ "perguntas": questions.get(slot) }),
                )
                .await?;
            if !created {
                debug!(code = %code, %slot, "main questions already present");
            }
        }
        self.store
            .merge_if(
                &documents::session_path(code.as_str()),
                &[("status", json!(SessionStatus::GeneratingMainQuestions))],
                json!({ "status": SessionStatus::MainQuestionsReady }),
            )
            .await?;
        Ok(())
    }

    /// Marks a generation round in flight. False means a call for this
    /// key is already outstanding.
    async fn begin(&self, key: &str) -> bool {
        self.inflight.lock().await.insert(key.to_string())
    }

    async fn finish(&self, key: &str) {
        self.inflight.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dueto_core::documents::{MainQuestionsDoc, SessionDoc};
    use dueto_core::get_typed;
    use dueto_test_utils::{MemoryDocumentStore, MockGeneration};

    const CODE: &str = "AB2CDEF";

    fn code() -> SessionCode {
        SessionCode::parse(CODE).unwrap()
    }

    fn reconciler(store: Arc<MemoryDocumentStore>, generation: Arc<MockGeneration>) -> Reconciler {
        Reconciler::new(store, generation, 2, Duration::from_millis(50))
    }

    async fn seed_paired_session(store: &dyn DocumentStore) {
        store
            .set(
                &documents::session_path(CODE),
                json!({
                    "title": "Mudar de cidade?",
                    "createdAt": "2026-01-10T12:00:00Z",
                    "status": "waiting_for_context_answers",
                    "ready_for_context_questions": true,
                    "context_questions_generated": false,
                }),
            )
            .await
            .unwrap();
        store
            .set(
                &documents::participant_path(CODE, Slot::User1),
                json!({"name": "Ana", "intro": "intro 1", "joinedAt": "2026-01-10T12:00:00Z"}),
            )
            .await
            .unwrap();
        store
            .set(
                &documents::participant_path(CODE, Slot::User2),
                json!({"name": "Bruno", "intro": "intro 2", "joinedAt": "2026-01-10T12:05:00Z"}),
            )
            .await
            .unwrap();
    }

    async fn seed_context_round(store: &dyn DocumentStore, slot: Slot, answered: usize) {
        let respostas: Vec<String> = (0..answered).map(|i| format!("R{i}")).collect();
        store
            .set(
                &documents::context_questions_path(CODE, slot),
                json!({"perguntas": ["P1", "P2"], "respostas": respostas}),
            )
            .await
            .unwrap();
    }

    async fn session_doc(store: &dyn DocumentStore) -> SessionDoc {
        get_typed(store, &documents::session_path(CODE))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn context_generation_runs_once_for_a_paired_session() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new());
        let rec = reconciler(store.clone(), generation.clone());

        seed_paired_session(store.as_ref()).await;
        rec.reconcile(&code()).await.unwrap();

        assert!(session_doc(store.as_ref()).await.context_questions_generated);
        for slot in Slot::BOTH {
            let round: ContextQuestionsDoc =
                get_typed(store.as_ref(), &documents::context_questions_path(CODE, slot))
                    .await
                    .unwrap()
                    .unwrap();
            assert!(!round.perguntas.is_empty());
            assert!(round.respostas.is_empty());
        }
        assert_eq!(generation.context_calls(), 1);

        // A second pass sees the documents and calls nothing.
        rec.reconcile(&code()).await.unwrap();
        assert_eq!(generation.context_calls(), 1);
    }

    #[tokio::test]
    async fn unpaired_session_generates_nothing() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new());
        let rec = reconciler(store.clone(), generation.clone());

        store
            .set(
                &documents::session_path(CODE),
                json!({
                    "title": "t",
                    "createdAt": "2026-01-10T12:00:00Z",
                    "status": "waiting_for_user2",
                    "ready_for_context_questions": false,
                    "context_questions_generated": false,
                }),
            )
            .await
            .unwrap();
        store
            .set(
                &documents::participant_path(CODE, Slot::User1),
                json!({"name": "Ana", "intro": "i", "joinedAt": "2026-01-10T12:00:00Z"}),
            )
            .await
            .unwrap();

        rec.reconcile(&code()).await.unwrap();
        assert_eq!(generation.context_calls(), 0);
        assert_eq!(generation.main_calls(), 0);
    }

    #[tokio::test]
    async fn failed_context_generation_releases_the_claim() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new().fail_context_times(1));
        let rec = reconciler(store.clone(), generation.clone());

        seed_paired_session(store.as_ref()).await;
        assert!(rec.reconcile(&code()).await.is_err());

        let session = session_doc(store.as_ref()).await;
        assert!(!session.context_questions_generated);
        assert!(store
            .get(&documents::context_questions_path(CODE, Slot::User1))
            .await
            .unwrap()
            .is_none());

        // The next pass retries from a clean claim and succeeds.
        rec.reconcile(&code()).await.unwrap();
        assert!(session_doc(store.as_ref()).await.context_questions_generated);
        assert_eq!(generation.context_calls(), 2);
    }

    #[tokio::test]
    async fn stalled_context_claim_is_re_driven() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new());
        let rec = reconciler(store.clone(), generation.clone());

        seed_paired_session(store.as_ref()).await;
        // Simulate a crash after the claim, before any document write.
        store
            .merge(
                &documents::session_path(CODE),
                json!({"context_questions_generated": true}),
            )
            .await
            .unwrap();

        rec.reconcile(&code()).await.unwrap();
        assert_eq!(generation.context_calls(), 1);
        assert!(store
            .get(&documents::context_questions_path(CODE, Slot::User2))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn partial_context_write_keeps_the_existing_round() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new());
        let rec = reconciler(store.clone(), generation.clone());

        seed_paired_session(store.as_ref()).await;
        store
            .merge(
                &documents::session_path(CODE),
                json!({"context_questions_generated": true}),
            )
            .await
            .unwrap();
        // user1's round survived the crash and already has an answer.
        store
            .set(
                &documents::context_questions_path(CODE, Slot::User1),
                json!({"perguntas": ["Old 1", "Old 2"], "respostas": ["kept"]}),
            )
            .await
            .unwrap();

        rec.reconcile(&code()).await.unwrap();

        let user1: ContextQuestionsDoc = get_typed(
            store.as_ref(),
            &documents::context_questions_path(CODE, Slot::User1),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(user1.perguntas, vec!["Old 1", "Old 2"]);
        assert_eq!(user1.respostas, vec!["kept"]);
        assert!(store
            .get(&documents::context_questions_path(CODE, Slot::User2))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn main_generation_waits_for_both_context_rounds() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new());
        let rec = reconciler(store.clone(), generation.clone());

        seed_paired_session(store.as_ref()).await;
        store
            .merge(
                &documents::session_path(CODE),
                json!({"context_questions_generated": true}),
            )
            .await
            .unwrap();
        seed_context_round(store.as_ref(), Slot::User1, 2).await;
        seed_context_round(store.as_ref(), Slot::User2, 1).await;

        rec.reconcile(&code()).await.unwrap();
        assert_eq!(generation.main_calls(), 0);
        assert_eq!(
            session_doc(store.as_ref()).await.status,
            SessionStatus::WaitingForContextAnswers
        );

        // The second round completes and the transition fires.
        seed_context_round(store.as_ref(), Slot::User2, 2).await;
        rec.reconcile(&code()).await.unwrap();

        assert_eq!(generation.main_calls(), 1);
        let session = session_doc(store.as_ref()).await;
        assert_eq!(session.status, SessionStatus::MainQuestionsReady);
        for slot in Slot::BOTH {
            let round: MainQuestionsDoc =
                get_typed(store.as_ref(), &documents::main_questions_path(CODE, slot))
                    .await
                    .unwrap()
                    .unwrap();
            assert!(!round.perguntas.is_empty());
        }

        // Reaching main_questions_ready makes further passes no-ops.
        rec.reconcile(&code()).await.unwrap();
        assert_eq!(generation.main_calls(), 1);
    }

    #[tokio::test]
    async fn failed_main_generation_keeps_the_status_for_the_sweep() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new().fail_main_times(1));
        let rec = reconciler(store.clone(), generation.clone());

        seed_paired_session(store.as_ref()).await;
        store
            .merge(
                &documents::session_path(CODE),
                json!({"context_questions_generated": true}),
            )
            .await
            .unwrap();
        seed_context_round(store.as_ref(), Slot::User1, 2).await;
        seed_context_round(store.as_ref(), Slot::User2, 2).await;

        assert!(rec.reconcile(&code()).await.is_err());
        // The claim is not reverted.
        assert_eq!(
            session_doc(store.as_ref()).await.status,
            SessionStatus::GeneratingMainQuestions
        );

        // The sweep re-drives the stalled session to completion.
        rec.reconcile(&code()).await.unwrap();
        assert_eq!(generation.main_calls(), 2);
        assert_eq!(
            session_doc(store.as_ref()).await.status,
            SessionStatus::MainQuestionsReady
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_loop_generates_in_the_background() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new());
        let rec = Arc::new(reconciler(store.clone(), generation.clone()));

        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let rec = rec.clone();
            let cancel = cancel.clone();
            async move { rec.run(cancel).await }
        });

        seed_paired_session(store.as_ref()).await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if store
                .get(&documents::context_questions_path(CODE, Slot::User2))
                .await
                .unwrap()
                .is_some()
            {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "context questions were never generated"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sweep_retries_until_the_webhook_recovers() {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(MockGeneration::new().fail_context_times(2));
        let rec = Arc::new(reconciler(store.clone(), generation.clone()));

        seed_paired_session(store.as_ref()).await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let rec = rec.clone();
            let cancel = cancel.clone();
            async move { rec.run(cancel).await }
        });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if store
                .get(&documents::context_questions_path(CODE, Slot::User1))
                .await
                .unwrap()
                .is_some()
            {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "generation was never retried to success"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(generation.context_calls() >= 3);
        cancel.cancel();
        task.await.unwrap();
    }
}
