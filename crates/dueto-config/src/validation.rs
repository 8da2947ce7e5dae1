// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, non-empty paths, and positive timer budgets.

use crate::diagnostic::ConfigError;
use crate::model::DuetoConfig;

/// Logging levels accepted for `server.log_level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DuetoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate server.host is not empty
    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    // Validate server.host looks like a valid IP or hostname
    if !config.server.host.trim().is_empty() {
        let addr = config.server.host.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{addr}` is not a valid IP address or hostname"),
            });
        }
    }

    // Validate server.log_level is a known level
    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level `{}` is not one of: {}",
                config.server.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    // Validate store.database_path is not empty
    if config.store.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.database_path must not be empty".to_string(),
        });
    }

    // Validate n8n.webhook_url is an HTTP(S) URL if set
    if let Some(url) = &config.n8n.webhook_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("n8n.webhook_url `{url}` must start with http:// or https://"),
        });
    }

    // Validate n8n.timeout_secs is positive
    if config.n8n.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "n8n.timeout_secs must be at least 1".to_string(),
        });
    }

    // Validate session.answer_timer_secs is positive
    if config.session.answer_timer_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.answer_timer_secs must be at least 1".to_string(),
        });
    }

    // Validate session.context_answer_count is positive
    if config.session.context_answer_count == 0 {
        errors.push(ConfigError::Validation {
            message: "session.context_answer_count must be at least 1".to_string(),
        });
    }

    // Validate session.resync_interval_secs is positive
    if config.session.resync_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.resync_interval_secs must be at least 1".to_string(),
        });
    }

    // Validate client.gateway_url is an HTTP(S) URL
    if !(config.client.gateway_url.starts_with("http://")
        || config.client.gateway_url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "client.gateway_url `{}` must start with http:// or https://",
                config.client.gateway_url
            ),
        });
    }

    // Validate client.draft_dir is not empty
    if config.client.draft_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "client.draft_dir must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
