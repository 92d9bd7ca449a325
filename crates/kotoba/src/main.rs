// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kotoba - a retrieval-augmented conversational assistant.
//!
//! This is the binary entry point for the Kotoba assistant.

mod ingest;
mod serve;
mod shell;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Kotoba - a retrieval-augmented conversational assistant.
#[derive(Parser, Debug)]
#[command(name = "kotoba", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (overrides the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the assistant server (HTTP gateway + optional Discord bot).
    Serve,
    /// Launch an interactive REPL session.
    Shell,
    /// Add a document to the knowledge base.
    Ingest {
        #[command(subcommand)]
        source: ingest::IngestSource,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kotoba={log_level},warn")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => kotoba_config::load_config_from_path(path)
            .map_err(kotoba_config::diagnostic::figment_to_config_errors)
            .and_then(|c| {
                kotoba_config::validation::validate_config(&c)?;
                Ok(c)
            }),
        None => kotoba_config::load_and_validate(),
    };

    let config = match config {
        Ok(config) => config,
        Err(errors) => {
            kotoba_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Shell) | None => shell::run_shell(config).await,
        Some(Commands::Ingest { source }) => ingest::run_ingest(config, source).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
