// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite connection wrapper.
//!
//! All access goes through the single tokio-rusqlite background thread,
//! which is what makes the store's read-modify-write merges atomic with
//! respect to each other.

use dueto_core::DuetoError;
use tracing::debug;

/// Convert a tokio-rusqlite error into DuetoError::Store.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> DuetoError {
    DuetoError::Store {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database behind the document store.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path` and run migrations.
    ///
    /// Parent directories are created as needed. `wal_mode` enables SQLite
    /// write-ahead logging, which serve mode wants for concurrent readers.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, DuetoError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| DuetoError::Store {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| DuetoError::Store {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| DuetoError::Store {
                source: Box::new(e),
            })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database with migrations applied. For tests.
    pub async fn open_in_memory() -> Result<Self, DuetoError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| DuetoError::Store {
                source: Box::new(e),
            })?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| DuetoError::Store {
                source: Box::new(e),
            })?;

        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so all committed data lands in the main file.
    pub async fn checkpoint(&self) -> Result<(), DuetoError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
