// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local draft persistence for the main-question sequence.
//!
//! One JSON file per session and slot under a configurable directory,
//! so a client restart mid-sequence resumes where it left off. Drafts
//! are strictly local and never synchronized.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use dueto_core::{DuetoError, Slot};

/// In-progress main answers for one session and slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainDraft {
    /// Answers so far, index-aligned with the question list.
    pub respostas: Vec<String>,
    /// Current question index.
    pub step: usize,
}

/// Directory of draft files, one per (session, slot).
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, code: &str, slot: Slot) -> PathBuf {
        self.dir.join(format!("dilemma_{code}_{slot}_main.json"))
    }

    /// Load the draft for a session and slot, if one exists.
    ///
    /// A malformed draft is logged and discarded rather than propagated,
    /// so a bad file never blocks the answer flow.
    pub async fn load(&self, code: &str, slot: Slot) -> Option<MainDraft> {
        let path = self.path(code, slot);
        let body = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&body) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding malformed draft");
                None
            }
        }
    }

    /// Persist the draft, creating the directory on first use.
    pub async fn save(&self, code: &str, slot: Slot, draft: &MainDraft) -> Result<(), DuetoError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DuetoError::Internal(format!("failed to create draft dir: {e}")))?;
        let body = serde_json::to_string(draft)
            .map_err(|e| DuetoError::Internal(format!("failed to serialize draft: {e}")))?;
        tokio::fs::write(self.path(code, slot), body)
            .await
            .map_err(|e| DuetoError::Internal(format!("failed to write draft: {e}")))?;
        Ok(())
    }

    /// Remove the draft after successful finalization. Absence is not an
    /// error.
    pub async fn clear(&self, code: &str, slot: Slot) -> Result<(), DuetoError> {
        match tokio::fs::remove_file(self.path(code, slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DuetoError::Internal(format!(
                "failed to clear draft: {e}"
            ))),
        }
    }
}
