// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./dueto.toml` > `~/.config/dueto/dueto.toml` > `/etc/dueto/dueto.toml`
//! with environment variable overrides via `DUETO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DuetoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dueto/dueto.toml` (system-wide)
/// 3. `~/.config/dueto/dueto.toml` (user XDG config)
/// 4. `./dueto.toml` (local directory)
/// 5. `DUETO_*` environment variables
pub fn load_config() -> Result<DuetoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DuetoConfig::default()))
        .merge(Toml::file("/etc/dueto/dueto.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("dueto/dueto.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("dueto.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DuetoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DuetoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DuetoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DuetoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `DUETO_STORE_DATABASE_PATH` must
/// map to `store.database_path`, not `store.database.path`.
fn env_provider() -> Env {
    Env::prefixed("DUETO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: DUETO_SESSION_ANSWER_TIMER_SECS -> "session_answer_timer_secs"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("store_", "store.", 1)
            .replacen("n8n_", "n8n.", 1)
            .replacen("session_", "session.", 1)
            .replacen("client_", "client.", 1);
        mapped.into()
    })
}
