// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Dueto session service.

use thiserror::Error;

/// The primary error type used across all Dueto crates.
#[derive(Debug, Error)]
pub enum DuetoError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Document store errors (database connection, query failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Question generation errors (webhook failure, malformed response).
    #[error("generation error: {message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Gateway errors (bind failure, request construction, transport).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A session code that is not 7 characters from the code alphabet.
    #[error("invalid session code: {code}")]
    InvalidCode { code: String },

    /// A document that was expected to exist does not.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// User-supplied input rejected by validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
