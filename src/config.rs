//! Configuration types for funbot.
//!
//! Every setting has a default, so the bot runs with no config file at all.
//! When a file is present it is loaded once at startup and validated before
//! any port is opened or the gateway is contacted; an invalid file is
//! rejected rather than silently replaced by defaults.
//!
//! The bot token never lives in the file. `bot.token_env` names the
//! environment variable that holds it.
//!
//! # Example
//! ```toml
//! [server]
//! port = 5000
//!
//! [bot]
//! command_prefix = "-"
//! log_file       = "log.txt"
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bot: BotConfig,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&content).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let prefix = &self.bot.command_prefix;
        anyhow::ensure!(
            prefix.chars().count() == 1,
            "bot.command_prefix must be exactly one character, got `{prefix}`"
        );
        anyhow::ensure!(
            !prefix.chars().all(char::is_whitespace),
            "bot.command_prefix must not be whitespace"
        );

        for (name, value) in [
            ("bot.token_env", &self.bot.token_env),
            ("bot.log_file", &self.bot.log_file),
            ("bot.gateway_url", &self.bot.gateway_url),
            ("bot.api_base_url", &self.bot.api_base_url),
            ("server.bind", &self.server.bind),
        ] {
            anyhow::ensure!(!value.trim().is_empty(), "{name} must not be empty");
        }

        anyhow::ensure!(
            self.bot.request_timeout_ms > 0,
            "bot.request_timeout_ms must be greater than zero"
        );
        Ok(())
    }
}

/// Liveness listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to bind (default: `0.0.0.0`).
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Port for the liveness endpoint (default: 5000).
    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            port: defaults::port(),
        }
    }
}

/// Everything the bot worker needs apart from the token itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Environment variable whose value is the bot token (default: `DISCORD_TOKEN`).
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Single character that marks a message as a command (default: `-`).
    #[serde(default = "defaults::command_prefix")]
    pub command_prefix: String,

    /// File that receives one line per startup (default: `log.txt`).
    #[serde(default = "defaults::log_file")]
    pub log_file: String,

    /// Gateway websocket base URL, without query string.
    #[serde(default = "defaults::gateway_url")]
    pub gateway_url: String,

    /// REST API base URL, including the version segment.
    #[serde(default = "defaults::api_base_url")]
    pub api_base_url: String,

    /// Timeout for REST calls in milliseconds (default: 10 000).
    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// When true, the `quit` command also stops the liveness server and the
    /// process exits. When false (default) only the bot connection stops.
    #[serde(default)]
    pub quit_stops_process: bool,
}

impl BotConfig {
    /// Resolve the token from the configured environment variable.
    ///
    /// Empty values are treated as missing.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// The configured prefix as a `char`.
    ///
    /// Falls back to `-` for an empty string; [`Config::load`] rejects that
    /// case, so this only matters for hand-built configs.
    pub fn prefix(&self) -> char {
        self.command_prefix.chars().next().unwrap_or('-')
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token_env: defaults::token_env(),
            command_prefix: defaults::command_prefix(),
            log_file: defaults::log_file(),
            gateway_url: defaults::gateway_url(),
            api_base_url: defaults::api_base_url(),
            request_timeout_ms: defaults::request_timeout_ms(),
            quit_stops_process: false,
        }
    }
}

mod defaults {
    pub fn bind() -> String { "0.0.0.0".into() }
    pub fn port() -> u16 { 5000 }
    pub fn token_env() -> String { "DISCORD_TOKEN".into() }
    pub fn command_prefix() -> String { "-".into() }
    pub fn log_file() -> String { "log.txt".into() }
    pub fn gateway_url() -> String { "wss://gateway.discord.gg".into() }
    pub fn api_base_url() -> String { "https://discord.com/api/v10".into() }
    pub fn request_timeout_ms() -> u64 { 10_000 }
}
