// SPDX-FileCopyrightText: 2026 Dueto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dueto - a two-party collaborative dilemma questionnaire.
//!
//! This is the binary entry point: `serve` runs the store, reconciler
//! and gateway; `create`, `join` and `report` are the participant-facing
//! terminal client.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod client;
mod report;
mod serve;
mod shutdown;

use clap::{Parser, Subcommand};
use dueto_core::Slot;

/// Dueto - a two-party collaborative dilemma questionnaire.
#[derive(Parser, Debug)]
#[command(name = "dueto", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Dueto server: document store, reconciler and gateway.
    Serve,
    /// Create a new dilemma session and print its share links.
    Create,
    /// Join a dilemma session and walk through its stages.
    Join {
        /// The 7-character session code.
        code: String,
        /// The participant slot to act as.
        #[arg(long, default_value = "user2")]
        user: Slot,
    },
    /// Fetch and render the comparison report for a session.
    Report {
        /// The 7-character session code.
        code: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match dueto_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            dueto_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Create) => client::run_create(config).await,
        Some(Commands::Join { code, user }) => client::run_join(config, &code, user).await,
        Some(Commands::Report { code }) => report::run_report(config, &code).await,
        None => {
            println!("dueto: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dueto={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config = dueto_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.server.port, 7227);
    }

    #[test]
    fn cli_parses_join_with_slot() {
        let cli = Cli::parse_from(["dueto", "join", "AB2CDEF", "--user", "user1"]);
        match cli.command {
            Some(Commands::Join { code, user }) => {
                assert_eq!(code, "AB2CDEF");
                assert_eq!(user, Slot::User1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_join_defaults_to_user2() {
        let cli = Cli::parse_from(["dueto", "join", "AB2CDEF"]);
        match cli.command {
            Some(Commands::Join { user, .. }) => assert_eq!(user, Slot::User2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
