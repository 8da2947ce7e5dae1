// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full session stack over an in-memory
//! store: gateway router, mock generator and reconciler. Tests drive the
//! gateway through [`TestHarness::request`] (tower `oneshot`, no network)
//! and advance generation explicitly with [`TestHarness::reconcile`], so
//! every stage transition is deterministic and inspectable.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use dueto_core::{DuetoError, SessionCode};
use dueto_gateway::{router, AppState};
use dueto_session::Reconciler;

use crate::memory_store::MemoryDocumentStore;
use crate::mock_generation::MockGeneration;

/// Resync interval handed to the reconciler. Tests drive reconciliation
/// explicitly, so the sweep only matters for `run`-loop tests.
const RESYNC_INTERVAL: Duration = Duration::from_millis(50);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    generation: MockGeneration,
    context_answer_count: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            generation: MockGeneration::new(),
            context_answer_count: 2,
        }
    }

    /// Replace the default mock generator (scripted questions, injected
    /// failures).
    pub fn with_generation(mut self, generation: MockGeneration) -> Self {
        self.generation = generation;
        self
    }

    /// Context answers required per slot before main generation fires.
    pub fn with_context_answer_count(mut self, count: usize) -> Self {
        self.context_answer_count = count;
        self
    }

    /// Build the test harness, assembling all subsystems.
    pub fn build(self) -> TestHarness {
        let store = Arc::new(MemoryDocumentStore::new());
        let generation = Arc::new(self.generation);
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            generation.clone(),
            self.context_answer_count,
            RESYNC_INTERVAL,
        ));
        let router = router(AppState {
            store: store.clone(),
        });
        TestHarness {
            store,
            generation,
            reconciler,
            router,
        }
    }
}

/// A complete in-process session stack for tests.
pub struct TestHarness {
    /// The shared document store.
    pub store: Arc<MemoryDocumentStore>,
    /// The scripted question generator.
    pub generation: Arc<MockGeneration>,
    /// The reconciler, for explicit `reconcile` passes or a spawned `run`.
    pub reconciler: Arc<Reconciler>,
    router: Router,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// One HTTP round trip through the gateway router.
    ///
    /// Panics on malformed requests or non-JSON responses; tests want the
    /// loud failure.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => Request::builder().method(method).uri(uri).body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should collect");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, value)
    }

    /// One reconciliation pass over a session.
    pub async fn reconcile(&self, code: &str) -> Result<(), DuetoError> {
        let code = SessionCode::parse(code)?;
        self.reconciler.reconcile(&code).await
    }

    /// Create a dilemma through the gateway and return its code.
    pub async fn create_dilemma(&self, title: &str, name: &str, intro: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/v1/dilemmas",
                Some(serde_json::json!({"title": title, "name": name, "intro": intro})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["code"].as_str().expect("code in response").to_string()
    }

    /// Submit the entry form for a slot.
    pub async fn enter(&self, code: &str, slot: &str, name: &str, intro: &str) {
        let (status, body) = self
            .request(
                Method::POST,
                &format!("/v1/dilemmas/{code}/entry?user={slot}"),
                Some(serde_json::json!({"name": name, "intro": intro})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "entry failed: {body}");
    }

    /// The per-slot view document.
    pub async fn view(&self, code: &str, slot: &str) -> Value {
        let (status, body) = self
            .request(
                Method::GET,
                &format!("/v1/dilemmas/{code}/view?user={slot}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "view failed: {body}");
        body
    }
}
