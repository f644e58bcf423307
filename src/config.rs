//! Configuration management for statewatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer defaults, a TOML file, `STATEWATCH_`
//! environment variables and command-line flags. Handlers read only their own
//! section and fall back to `KW_*` environment variables for empty fields
//! (see [`env_or`]).

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Handler selection and per-handler settings.
    pub handler: HandlerConfig,
    /// Settings shared by all handlers' messages.
    pub message: MessageConfig,
}

/// Selects the active handler and holds one section per backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HandlerConfig {
    /// Registry name of the active handler.
    pub name: String,
    /// Timeout applied to every outbound request.
    pub timeout_seconds: u64,
    pub slack: SlackConfig,
    pub slackwebhook: SlackWebhookConfig,
    pub msteams: MsTeamsConfig,
    pub cloudevent: CloudEventConfig,
    pub mattermost: MattermostConfig,
    pub flock: FlockConfig,
    pub webhook: WebhookConfig,
    pub lark: LarkConfig,
    pub telegram: TelegramConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MessageConfig {
    /// Title used by all handlers. Empty means "use the handler's fallback".
    pub title: String,
}

/// Slack bot API settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
    /// Base URL of the Slack Web API.
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            api_url: "https://slack.com/api".to_string(),
        }
    }
}

/// Slack incoming-webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SlackWebhookConfig {
    pub channel: String,
    pub username: String,
    pub emoji: String,
    pub slackwebhookurl: String,
}

/// Microsoft Teams connector settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MsTeamsConfig {
    pub webhookurl: String,
}

/// CloudEvents sink settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CloudEventConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MattermostConfig {
    pub channel: String,
    pub url: String,
    pub username: String,
    pub icon_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct FlockConfig {
    pub url: String,
}

/// Generic JSON webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
    /// Path to a PEM CA certificate to trust in addition to the system roots.
    pub cert: String,
    /// Skip TLS certificate verification.
    pub tls_skip: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LarkConfig {
    pub webhookurl: String,
}

/// Telegram bot API settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub channel: String,
    /// Base URL of the Telegram Bot API.
    pub api_url: String,
}

/// Outgoing mail settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SmtpConfig {
    /// Comma-separated recipient addresses.
    pub to: String,
    pub from: String,
    /// Relay as `host` or `host:port`.
    pub smarthost: String,
    pub username: String,
    pub password: String,
    /// Fail instead of falling back to plain text when STARTTLS is unavailable.
    pub require_tls: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            timeout_seconds: 10,
            slack: SlackConfig::default(),
            slackwebhook: SlackWebhookConfig::default(),
            msteams: MsTeamsConfig::default(),
            cloudevent: CloudEventConfig::default(),
            mattermost: MattermostConfig::default(),
            flock: FlockConfig::default(),
            webhook: WebhookConfig::default(),
            lark: LarkConfig::default(),
            telegram: TelegramConfig::default(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            handler: HandlerConfig::default(),
            message: MessageConfig::default(),
        }
    }
}

impl Config {
    /// Loads the application configuration by layering defaults, the optional
    /// TOML file, environment variables and command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            // e.g. STATEWATCH_HANDLER__NAME=slack
            .merge(Env::prefixed("STATEWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;

        if config.handler.timeout_seconds == 0 {
            bail!("handler.timeout_seconds must be greater than zero");
        }
        Ok(config)
    }
}

/// Returns `value`, or the content of the environment variable `var` when
/// `value` is empty.
pub fn env_or(value: &str, var: &str) -> String {
    if value.is_empty() {
        env::var(var).unwrap_or_default()
    } else {
        value.to_string()
    }
}
