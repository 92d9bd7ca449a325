// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kotoba shell` command implementation.
//!
//! An interactive REPL against the orchestrator. Plain lines are
//! conversation turns; `:`-prefixed lines are shell commands.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use kotoba_agent::TurnRequest;
use kotoba_config::KotobaConfig;
use kotoba_core::KotobaError;

use crate::wiring;

const SHELL_HELP: &str = ":help - show this message
:emotion <message> - chat with emotion analysis attached
:reset - clear this session's conversation history
:quit - exit the shell

Anything else is sent to the assistant as a conversation turn.";

/// Runs the `kotoba shell` command.
pub async fn run_shell(config: KotobaConfig) -> Result<(), KotobaError> {
    let db = wiring::open_database(&config).await?;
    let knowledge = wiring::build_knowledge(&config, &db).await?;
    let orchestrator = wiring::build_orchestrator(&config, db.clone(), &knowledge)?;

    let thread_id = format!("cli:{}", uuid::Uuid::new_v4());
    debug!(thread_id = thread_id.as_str(), "shell session started");

    let mut editor = DefaultEditor::new()
        .map_err(|e| KotobaError::Internal(format!("failed to initialize readline: {e}")))?;

    println!(
        "{} interactive shell. Type {} for commands, {} to exit.",
        config.agent.name.bold(),
        ":help".cyan(),
        ":quit".cyan()
    );

    loop {
        let line = match editor.readline("kotoba> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                return Err(KotobaError::Internal(format!("readline error: {e}")));
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        let (utterance, want_emotion) = match trimmed {
            ":quit" | ":exit" => break,
            ":help" => {
                println!("{SHELL_HELP}");
                continue;
            }
            ":reset" => {
                orchestrator.reset_thread(&thread_id).await?;
                println!("{}", "history cleared".dimmed());
                continue;
            }
            other => match other.strip_prefix(":emotion ") {
                Some(rest) => (rest.to_string(), true),
                None => {
                    if other.starts_with(':') {
                        println!("unknown command; type {} for help", ":help".cyan());
                        continue;
                    }
                    (other.to_string(), false)
                }
            },
        };

        let reply = orchestrator
            .handle_turn(TurnRequest {
                thread_id: thread_id.clone(),
                channel: "cli".to_string(),
                utterance,
                want_emotion,
                want_retrieval: true,
            })
            .await;

        println!("{}", reply.message);
        if let Some(record) = reply.emotion {
            println!(
                "{}",
                format!(
                    "[{} | intensity {}/5 | {} | suggested tone: {}]",
                    record.primary_emotion, record.intensity, record.sentiment, record.response_tone
                )
                .dimmed()
            );
        }
        if let Some(error) = reply.error {
            eprintln!("{}", format!("warning: {error}").yellow());
        }
    }

    db.close().await?;
    println!("bye");
    Ok(())
}
