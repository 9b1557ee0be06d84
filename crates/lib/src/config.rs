//! Configuration types and loading.
//!
//! Config is loaded once from an optional JSON file (e.g. `./relay.json`) and then
//! overlaid with environment variables. The result is wrapped in `Arc` and handed to
//! every component; nothing below this module reads the environment.

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Top-level relay config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Inbound side: bot credential and the monitored channel.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Outbound side: webhook URL and the fixed notification decoration.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Liveness HTTP listener.
    #[serde(default)]
    pub liveness: LivenessConfig,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Monitored channel username, including the leading `@`. Overridden by TELEGRAM_CHANNEL_USERNAME.
    /// When unset, every text/photo the bot sees is forwarded.
    pub channel_username: Option<String>,
    /// Bot API base URL. Overridden by TELEGRAM_API_BASE (used by tests and self-hosted Bot API servers).
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Discard updates queued while the relay was down.
    #[serde(default = "default_true")]
    pub drop_pending_updates: bool,
    /// getUpdates long-poll timeout in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

/// Discord webhook and notification decoration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Webhook URL. Overridden by DISCORD_WEBHOOK_URL env when set.
    pub webhook_url: Option<String>,
    /// Mention placed in the message content of every notification.
    #[serde(default = "default_mention")]
    pub mention: String,
    /// Embed color (decimal RGB).
    #[serde(default = "default_color")]
    pub color: u32,
    /// First footer segment (channel handle).
    #[serde(default = "default_footer_handle")]
    pub footer_handle: String,
    /// Last footer segment (attribution).
    #[serde(default = "default_footer_tag")]
    pub footer_tag: String,
    /// chrono format for the footer date (default is the Italian short date, e.g. 19/10/2026).
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

/// Liveness listener bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessConfig {
    /// Bind address (default "0.0.0.0" so hosted uptime checks can reach it).
    #[serde(default = "default_liveness_bind")]
    pub bind: String,
    /// Port (default 3000). Overridden by PORT env when set.
    #[serde(default = "default_liveness_port")]
    pub port: u16,
}

fn default_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_mention() -> String {
    "<@1346512369102225560>".to_string()
}

fn default_color() -> u32 {
    16744256
}

fn default_footer_handle() -> String {
    "t.me/poldonews".to_string()
}

fn default_footer_tag() -> String {
    "jes.is-a.dev".to_string()
}

fn default_date_format() -> String {
    "%-d/%-m/%Y".to_string()
}

fn default_liveness_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_liveness_port() -> u16 {
    3000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_username: None,
            api_base: default_api_base(),
            drop_pending_updates: default_true(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            mention: default_mention(),
            color: default_color(),
            footer_handle: default_footer_handle(),
            footer_tag: default_footer_tag(),
            date_format: default_date_format(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            bind: default_liveness_bind(),
            port: default_liveness_port(),
        }
    }
}

/// Trimmed, non-empty value or None.
fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl Config {
    /// Overlay environment values onto the file config. `lookup` is `std::env::var` in
    /// production; tests pass a map so they never touch process state.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(|v| non_empty(&v));
        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(channel) = get("TELEGRAM_CHANNEL_USERNAME") {
            self.telegram.channel_username = Some(channel);
        }
        if let Some(base) = get("TELEGRAM_API_BASE") {
            self.telegram.api_base = base;
        }
        if let Some(url) = get("DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = Some(url);
        }
        if let Some(port) = get("PORT") {
            self.liveness.port = port
                .parse()
                .with_context(|| format!("invalid PORT value {:?}", port))?;
        }
        Ok(())
    }

    /// Bot token, if configured and non-blank.
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Webhook URL, if configured and non-blank.
    pub fn webhook_url(&self) -> Option<&str> {
        self.discord
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Monitored channel username without its leading `@`. None means "forward everything".
    pub fn monitored_channel(&self) -> Option<&str> {
        self.telegram
            .channel_username
            .as_deref()
            .map(|s| {
                let s = s.trim();
                s.strip_prefix('@').unwrap_or(s)
            })
            .filter(|s| !s.is_empty())
    }

    /// Both credentials must be present and the footer date format must parse.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token().is_none() {
            anyhow::bail!("telegram bot token not configured (set TELEGRAM_BOT_TOKEN or telegram.botToken)");
        }
        if self.webhook_url().is_none() {
            anyhow::bail!("discord webhook url not configured (set DISCORD_WEBHOOK_URL or discord.webhookUrl)");
        }
        let fmt = &self.discord.date_format;
        if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
            anyhow::bail!("invalid discord.dateFormat {:?}", fmt);
        }
        Ok(())
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("relay.json"))
}

/// Load config from `path` (or the default path), then apply process environment overrides.
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok((config, path))
}
