// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kotoba.toml` > `~/.config/kotoba/kotoba.toml`
//! > `/etc/kotoba/kotoba.toml`, with environment variable overrides via the
//! `KOTOBA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KotobaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kotoba/kotoba.toml` (system-wide)
/// 3. `~/.config/kotoba/kotoba.toml` (user XDG config)
/// 4. `./kotoba.toml` (local directory)
/// 5. `KOTOBA_*` environment variables
pub fn load_config() -> Result<KotobaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KotobaConfig::default()))
        .merge(Toml::file("/etc/kotoba/kotoba.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kotoba/kotoba.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kotoba.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KotobaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KotobaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KotobaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KotobaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KOTOBA_DISCORD_BOT_TOKEN` must map to
/// `discord.bot_token`, not `discord.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("KOTOBA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: KOTOBA_DISCORD_BOT_TOKEN -> "discord_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("embedding_", "embedding.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("knowledge_", "knowledge.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("discord_", "discord.", 1);
        mapped.into()
    })
}
