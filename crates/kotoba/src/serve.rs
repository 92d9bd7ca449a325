// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kotoba serve` command implementation.
//!
//! Starts the HTTP/WebSocket gateway and, when a bot token is configured,
//! the Discord channel runner. Both share one orchestrator and one ingest
//! pipeline. Shutdown is cooperative via a cancellation token on ctrl-c.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kotoba_agent::ChannelRunner;
use kotoba_config::KotobaConfig;
use kotoba_core::KotobaError;
use kotoba_discord::DiscordChannel;
use kotoba_gateway::{GatewayState, ServerConfig};

use crate::wiring;

/// Runs the `kotoba serve` command.
pub async fn run_serve(config: KotobaConfig) -> Result<(), KotobaError> {
    info!(agent = config.agent.name.as_str(), "starting kotoba serve");

    let db = wiring::open_database(&config).await?;
    let knowledge = wiring::build_knowledge(&config, &db).await?;
    let orchestrator = wiring::build_orchestrator(&config, db.clone(), &knowledge)?;

    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();

    if config.gateway.enabled {
        let state = GatewayState {
            orchestrator: orchestrator.clone(),
            ingest: knowledge.ingest.clone(),
            db: db.clone(),
        };
        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let gateway_cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                result = kotoba_gateway::start_server(&server_config, state) => {
                    if let Err(e) = result {
                        error!(error = %e, "gateway server stopped");
                    }
                }
                _ = gateway_cancel.cancelled() => {}
            }
        }));
    } else {
        info!("gateway disabled by configuration");
    }

    if config.discord.bot_token.is_some() {
        let channel = DiscordChannel::new(&config.discord)?;
        let mut runner = ChannelRunner::new(
            Box::new(channel),
            orchestrator.clone(),
            knowledge.ingest.clone(),
            config.discord.command_prefix.clone(),
        );
        let runner_cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = runner.run(runner_cancel).await {
                error!(error = %e, "discord runner stopped");
            }
        }));
    } else {
        info!("discord integration disabled (no bot token)");
    }

    if tasks.is_empty() {
        warn!("nothing to serve: gateway disabled and no discord token");
        return Ok(());
    }

    tokio::signal::ctrl_c().await.map_err(|e| KotobaError::Internal(format!(
        "failed to install ctrl-c handler: {e}"
    )))?;
    info!("shutdown signal received");
    cancel.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "task join error during shutdown");
        }
    }

    db.close().await?;
    info!("kotoba stopped");
    Ok(())
}
