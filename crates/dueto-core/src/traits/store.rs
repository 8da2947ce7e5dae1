// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store trait: the single source of truth for session state.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::DuetoError;
use crate::types::HealthStatus;

/// A change notification for a single document.
#[derive(Debug, Clone)]
pub struct DocumentEvent {
    /// Full document path, e.g. `dilemmas/AB2CDEF/users/user2`.
    pub path: String,
    /// The document body after the change.
    pub data: Value,
}

/// A realtime document database keyed by slash-separated paths.
///
/// Documents are JSON objects. Writes publish a [`DocumentEvent`] on the
/// change feed after they commit, which is what drives the reconciler and
/// the WebSocket feed. One-time transitions are built on [`create`] and
/// [`merge_if`] rather than read-then-write.
///
/// [`create`]: DocumentStore::create
/// [`merge_if`]: DocumentStore::merge_if
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. `None` if it does not exist.
    async fn get(&self, path: &str) -> Result<Option<Value>, DuetoError>;

    /// Create or fully replace a document.
    async fn set(&self, path: &str, data: Value) -> Result<(), DuetoError>;

    /// Create a document only if the path is vacant.
    ///
    /// Returns `false` (without writing) when a document already exists.
    async fn create(&self, path: &str, data: Value) -> Result<bool, DuetoError>;

    /// Shallow-merge fields into a document, creating it if absent.
    async fn merge(&self, path: &str, patch: Value) -> Result<(), DuetoError>;

    /// Compare-and-swap merge: apply `patch` only if every `expect` field
    /// currently holds the given value.
    ///
    /// A field absent from the document compares as JSON null; a missing
    /// document never matches. Returns whether the merge was applied.
    async fn merge_if(
        &self,
        path: &str,
        expect: &[(&str, Value)],
        patch: Value,
    ) -> Result<bool, DuetoError>;

    /// Paths of all existing documents under a prefix, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, DuetoError>;

    /// Subscribe to the change feed for all documents.
    fn subscribe(&self) -> broadcast::Receiver<DocumentEvent>;

    /// Health probe for the backing storage.
    async fn health_check(&self) -> Result<HealthStatus, DuetoError>;

    /// Flush pending writes and release the backing storage.
    async fn close(&self) -> Result<(), DuetoError>;
}

/// Fetch a document and deserialize it into a typed body.
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &str,
) -> Result<Option<T>, DuetoError> {
    match store.get(path).await? {
        Some(value) => {
            let doc = serde_json::from_value(value).map_err(|e| DuetoError::Store {
                source: Box::new(e),
            })?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}
