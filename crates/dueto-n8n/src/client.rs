// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the n8n generation webhooks.
//!
//! Provides [`N8nClient`] which handles request construction, JSON
//! decoding, and transient error retry with exponential backoff.

use std::time::Duration;

use dueto_core::DuetoError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{
    ContextQuestionsEntry, ContextQuestionsRequest, MainQuestionsRequest, MainQuestionsResponse,
};

/// Webhook endpoint that produces the per-participant context questions.
pub const GEN_CONTEXT_QUESTIONS: &str = "gen-context-questions";

/// Webhook endpoint that produces the main question sets.
pub const GEN_PRINCIPAL_QUESTIONS: &str = "gen-principal-questions";

/// HTTP client for n8n webhook communication.
///
/// Manages connection pooling and retry logic for transient errors
/// (429, 500, 502, 503, 504, connection failures).
#[derive(Debug, Clone)]
pub struct N8nClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base: Duration,
}

impl N8nClient {
    /// Creates a new webhook client.
    ///
    /// # Arguments
    /// * `base_url` - Webhook base URL; endpoints are appended as path segments
    /// * `timeout` - Per-request timeout
    /// * `max_retries` - Retries after the first attempt for transient errors
    /// * `retry_base` - First backoff delay, doubled on each further retry
    pub fn new(
        base_url: String,
        timeout: Duration,
        max_retries: u32,
        retry_base: Duration,
    ) -> Result<Self, DuetoError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DuetoError::Generation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            retry_base,
        })
    }

    /// Calls `gen-context-questions` for a freshly paired session.
    pub async fn context_questions(
        &self,
        request: &ContextQuestionsRequest,
    ) -> Result<Vec<ContextQuestionsEntry>, DuetoError> {
        self.post_json(GEN_CONTEXT_QUESTIONS, request).await
    }

    /// Calls `gen-principal-questions` once both context rounds are answered.
    pub async fn main_questions(
        &self,
        request: &MainQuestionsRequest,
    ) -> Result<MainQuestionsResponse, DuetoError> {
        self.post_json(GEN_PRINCIPAL_QUESTIONS, request).await
    }

    /// Posts a JSON body and decodes a JSON response.
    ///
    /// Transient failures are retried up to `max_retries` times with the
    /// backoff delay doubling between attempts.
    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, DuetoError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_base * 2u32.pow(attempt - 1);
                warn!(endpoint, attempt, backoff_ms = backoff.as_millis() as u64,
                    "retrying webhook call after transient error");
                tokio::time::sleep(backoff).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt < self.max_retries {
                        warn!(endpoint, error = %e, "webhook request failed, will retry");
                        last_error = Some(DuetoError::Generation {
                            message: format!("webhook request failed: {e}"),
                            source: Some(Box::new(e)),
                        });
                        continue;
                    }
                    return Err(DuetoError::Generation {
                        message: format!("webhook request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let status = response.status();
            debug!(endpoint, status = %status, attempt, "webhook response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| DuetoError::Generation {
                    message: format!("failed to read webhook response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| DuetoError::Generation {
                    message: format!("failed to parse webhook response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(endpoint, status = %status, body = %body, "transient error, will retry");
                last_error = Some(DuetoError::Generation {
                    message: format!("webhook returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            return Err(DuetoError::Generation {
                message: format!("webhook returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| DuetoError::Generation {
            message: "webhook call failed after retries".into(),
            source: None,
        }))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
