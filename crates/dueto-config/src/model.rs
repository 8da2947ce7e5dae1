// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Dueto session service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Dueto configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DuetoConfig {
    /// Gateway server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Question generation webhook settings.
    #[serde(default)]
    pub n8n: N8nConfig,

    /// Session flow settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Terminal client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7227
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("dueto").join("dueto.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("dueto.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Question generation webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct N8nConfig {
    /// Base URL of the n8n webhook workflow. `None` disables generation,
    /// which only makes sense for offline testing.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_n8n_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts after the initial request on transient failures.
    #[serde(default = "default_n8n_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_n8n_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for N8nConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_n8n_timeout_secs(),
            max_retries: default_n8n_max_retries(),
            retry_base_ms: default_n8n_retry_base_ms(),
        }
    }
}

fn default_n8n_timeout_secs() -> u64 {
    30
}

fn default_n8n_max_retries() -> u32 {
    3
}

fn default_n8n_retry_base_ms() -> u64 {
    500
}

/// Session flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Response budget per main question, in seconds.
    #[serde(default = "default_answer_timer_secs")]
    pub answer_timer_secs: u64,

    /// Context answers required per participant before main questions
    /// are generated.
    #[serde(default = "default_context_answer_count")]
    pub context_answer_count: usize,

    /// Interval of the reconciler's full resync pass, in seconds.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            answer_timer_secs: default_answer_timer_secs(),
            context_answer_count: default_context_answer_count(),
            resync_interval_secs: default_resync_interval_secs(),
        }
    }
}

fn default_answer_timer_secs() -> u64 {
    240
}

fn default_context_answer_count() -> usize {
    2
}

fn default_resync_interval_secs() -> u64 {
    5
}

/// Terminal client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the gateway the client talks to.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Directory for local answer drafts.
    #[serde(default = "default_draft_dir")]
    pub draft_dir: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            draft_dir: default_draft_dir(),
        }
    }
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:7227".to_string()
}

fn default_draft_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("dueto").join("drafts"))
        .unwrap_or_else(|| std::path::PathBuf::from("drafts"))
        .to_string_lossy()
        .into_owned()
}
