// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`DocumentStore`] trait.
//!
//! Documents live in the `documents` table as serialized JSON. Change
//! events are published on a broadcast channel after the write commits,
//! so subscribers never observe an event for data they cannot read back.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use dueto_core::documents::merge_values;
use dueto_core::{DocumentEvent, DocumentStore, DuetoError, HealthStatus};

use crate::database::{map_tr_err, Database};

/// Capacity of the change feed. Lagging subscribers lose the oldest
/// events and are expected to resynchronize by re-reading.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const UPSERT_SQL: &str = "INSERT INTO documents (path, data) VALUES (?1, ?2) \
     ON CONFLICT(path) DO UPDATE SET data = excluded.data, \
     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Parse a stored document body.
///
/// Stored data is always written by this store, so a parse failure means
/// on-disk corruption.
fn parse_doc(data: &str) -> Result<Value, rusqlite::Error> {
    serde_json::from_str(data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn select_doc(conn: &rusqlite::Connection, path: &str) -> Result<Option<String>, rusqlite::Error> {
    match conn.query_row(
        "SELECT data FROM documents WHERE path = ?1",
        rusqlite::params![path],
        |row| row.get(0),
    ) {
        Ok(data) => Ok(Some(data)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore {
    db: Database,
    events: broadcast::Sender<DocumentEvent>,
}

impl SqliteDocumentStore {
    /// Wrap an opened database.
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { db, events }
    }

    fn publish(&self, path: &str, data: Value) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(DocumentEvent {
            path: path.to_string(),
            data,
        });
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, DuetoError> {
        let path_owned = path.to_string();
        let row = self
            .db
            .connection()
            .call(move |conn| select_doc(conn, &path_owned))
            .await
            .map_err(map_tr_err)?;

        match row {
            Some(data) => {
                let value = serde_json::from_str(&data).map_err(|e| DuetoError::Store {
                    source: Box::new(e),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, path: &str, data: Value) -> Result<(), DuetoError> {
        let path_owned = path.to_string();
        let body = data.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(UPSERT_SQL, rusqlite::params![path_owned, body])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.publish(path, data);
        Ok(())
    }

    async fn create(&self, path: &str, data: Value) -> Result<bool, DuetoError> {
        let path_owned = path.to_string();
        let body = data.to_string();
        let inserted = self
            .db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let rows = conn.execute(
                    "INSERT INTO documents (path, data) VALUES (?1, ?2) \
                     ON CONFLICT(path) DO NOTHING",
                    rusqlite::params![path_owned, body],
                )?;
                Ok(rows == 1)
            })
            .await
            .map_err(map_tr_err)?;

        if inserted {
            self.publish(path, data);
        }
        Ok(inserted)
    }

    async fn merge(&self, path: &str, patch: Value) -> Result<(), DuetoError> {
        let path_owned = path.to_string();
        let merged = self
            .db
            .connection()
            .call(move |conn| -> Result<Value, rusqlite::Error> {
                let mut doc = match select_doc(conn, &path_owned)? {
                    Some(body) => parse_doc(&body)?,
                    None => Value::Object(Default::default()),
                };
                merge_values(&mut doc, patch);
                conn.execute(UPSERT_SQL, rusqlite::params![path_owned, doc.to_string()])?;
                Ok(doc)
            })
            .await
            .map_err(map_tr_err)?;

        self.publish(path, merged);
        Ok(())
    }

    async fn merge_if(
        &self,
        path: &str,
        expect: &[(&str, Value)],
        patch: Value,
    ) -> Result<bool, DuetoError> {
        let path_owned = path.to_string();
        let expect_owned: Vec<(String, Value)> = expect
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();

        let outcome = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<Value>, rusqlite::Error> {
                // A missing document never matches.
                let Some(body) = select_doc(conn, &path_owned)? else {
                    return Ok(None);
                };
                let mut doc = parse_doc(&body)?;

                // Absent fields compare as JSON null.
                let matches = expect_owned
                    .iter()
                    .all(|(key, want)| doc.get(key).unwrap_or(&Value::Null) == want);
                if !matches {
                    return Ok(None);
                }

                merge_values(&mut doc, patch);
                conn.execute(UPSERT_SQL, rusqlite::params![path_owned, doc.to_string()])?;
                Ok(Some(doc))
            })
            .await
            .map_err(map_tr_err)?;

        match outcome {
            Some(merged) => {
                self.publish(path, merged);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, DuetoError> {
        let prefix_owned = prefix.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                // substr comparison instead of LIKE: '_' in paths such as
                // context_questions must match literally.
                let mut stmt = conn.prepare(
                    "SELECT path FROM documents \
                     WHERE substr(path, 1, length(?1)) = ?1 ORDER BY path",
                )?;
                let rows = stmt.query_map(rusqlite::params![prefix_owned], |row| {
                    row.get::<_, String>(0)
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    async fn health_check(&self) -> Result<HealthStatus, DuetoError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), DuetoError> {
        self.db.checkpoint().await
    }
}
