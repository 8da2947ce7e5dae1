// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`DocumentStore`] for deterministic testing.
//!
//! A `BTreeMap` behind an async mutex, with the same post-commit change
//! feed as the SQLite store. `list` comes back sorted for free.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use dueto_core::documents::merge_values;
use dueto_core::{DocumentEvent, DocumentStore, DuetoError, HealthStatus};

/// Capacity of the change feed channel.
const EVENT_CAPACITY: usize = 256;

/// An in-memory document store keyed by slash-separated paths.
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<String, Value>>,
    events: broadcast::Sender<DocumentEvent>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            documents: Mutex::new(BTreeMap::new()),
            events,
        }
    }

    fn publish(&self, path: &str, data: &Value) {
        // A send error only means nobody is subscribed.
        let _ = self.events.send(DocumentEvent {
            path: path.to_string(),
            data: data.clone(),
        });
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, DuetoError> {
        Ok(self.documents.lock().await.get(path).cloned())
    }

    async fn set(&self, path: &str, data: Value) -> Result<(), DuetoError> {
        self.documents
            .lock()
            .await
            .insert(path.to_string(), data.clone());
        self.publish(path, &data);
        Ok(())
    }

    async fn create(&self, path: &str, data: Value) -> Result<bool, DuetoError> {
        let mut documents = self.documents.lock().await;
        if documents.contains_key(path) {
            return Ok(false);
        }
        documents.insert(path.to_string(), data.clone());
        drop(documents);
        self.publish(path, &data);
        Ok(true)
    }

    async fn merge(&self, path: &str, patch: Value) -> Result<(), DuetoError> {
        let mut documents = self.documents.lock().await;
        let doc = documents
            .entry(path.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        merge_values(doc, patch);
        let data = doc.clone();
        drop(documents);
        self.publish(path, &data);
        Ok(())
    }

    async fn merge_if(
        &self,
        path: &str,
        expect: &[(&str, Value)],
        patch: Value,
    ) -> Result<bool, DuetoError> {
        let mut documents = self.documents.lock().await;
        let Some(doc) = documents.get_mut(path) else {
            return Ok(false);
        };
        let matches = expect.iter().all(|(field, expected)| {
            doc.get(*field).unwrap_or(&Value::Null) == expected
        });
        if !matches {
            return Ok(false);
        }
        merge_values(doc, patch);
        let data = doc.clone();
        drop(documents);
        self.publish(path, &data);
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, DuetoError> {
        Ok(self
            .documents
            .lock()
            .await
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    async fn health_check(&self) -> Result<HealthStatus, DuetoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), DuetoError> {
        Ok(())
    }
}
