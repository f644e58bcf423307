//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the TOML file and environment variables.

use crate::handlers::registry::HandlerKind;
use clap::Parser;
use figment::{
    providers::Serialized,
    value::{Dict, Map},
    Error, Figment, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Forwards Kubernetes resource state changes to a notification backend.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Name of the notification handler to use (e.g. slack, ms-teams).
    #[arg(long, value_name = "NAME")]
    pub handler: Option<String>,

    /// Title used in notifications.
    #[arg(long)]
    pub title: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Timeout for outbound notification requests.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// API token of the selected handler.
    #[arg(short, long, requires = "handler")]
    pub token: Option<String>,

    /// Channel of the selected handler.
    #[arg(short, long, requires = "handler")]
    pub channel: Option<String>,

    /// Webhook or endpoint URL of the selected handler.
    #[arg(short, long, requires = "handler")]
    pub url: Option<String>,

    /// Read events from this JSON-lines file instead of stdin.
    #[arg(long, value_name = "FILE")]
    pub events: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Credential {
    Token,
    Channel,
    Url,
}

impl Credential {
    fn flag(&self) -> &'static str {
        match self {
            Credential::Token => "--token",
            Credential::Channel => "--channel",
            Credential::Url => "--url",
        }
    }
}

/// Maps a credential flag onto the config key of the selected handler.
fn credential_key(kind: HandlerKind, credential: Credential) -> Option<&'static str> {
    use Credential::*;
    match (kind, credential) {
        (HandlerKind::Slack, Token) => Some("handler.slack.token"),
        (HandlerKind::Slack, Channel) => Some("handler.slack.channel"),
        (HandlerKind::SlackWebhook, Channel) => Some("handler.slackwebhook.channel"),
        (HandlerKind::SlackWebhook, Url) => Some("handler.slackwebhook.slackwebhookurl"),
        (HandlerKind::MsTeams, Url) => Some("handler.msteams.webhookurl"),
        (HandlerKind::CloudEvent, Url) => Some("handler.cloudevent.url"),
        (HandlerKind::Mattermost, Channel) => Some("handler.mattermost.channel"),
        (HandlerKind::Mattermost, Url) => Some("handler.mattermost.url"),
        (HandlerKind::Flock, Url) => Some("handler.flock.url"),
        (HandlerKind::Webhook, Url) => Some("handler.webhook.url"),
        (HandlerKind::Lark, Url) => Some("handler.lark.webhookurl"),
        (HandlerKind::Telegram, Token) => Some("handler.telegram.token"),
        (HandlerKind::Telegram, Channel) => Some("handler.telegram.channel"),
        (HandlerKind::Smtp, Channel) => Some("handler.smtp.to"),
        (HandlerKind::Smtp, Url) => Some("handler.smtp.smarthost"),
        _ => None,
    }
}

impl Cli {
    /// Collects the flags that were actually given as `(key path, value)` pairs.
    fn overrides(&self) -> Result<Vec<(&'static str, String)>, Error> {
        let mut overrides = Vec::new();

        if let Some(level) = &self.log_level {
            overrides.push(("log_level", level.clone()));
        }
        if let Some(title) = &self.title {
            overrides.push(("message.title", title.clone()));
        }

        let Some(name) = &self.handler else {
            return Ok(overrides);
        };
        overrides.push(("handler.name", name.clone()));

        let kind: HandlerKind = name.parse().map_err(|e| Error::from(format!("{e}")))?;
        let credentials = [
            (Credential::Token, &self.token),
            (Credential::Channel, &self.channel),
            (Credential::Url, &self.url),
        ];
        for (credential, value) in credentials {
            let Some(value) = value else { continue };
            let key = credential_key(kind, credential).ok_or_else(|| {
                Error::from(format!(
                    "{} is not supported by the {} handler",
                    credential.flag(),
                    kind
                ))
            })?;
            overrides.push((key, value.clone()));
        }

        Ok(overrides)
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut figment = Figment::new();
        for (key, value) in self.overrides()? {
            figment = figment.merge(Serialized::default(key, value));
        }
        // Numeric values keep their type so extraction into `u64` succeeds.
        if let Some(timeout) = self.timeout_seconds {
            figment = figment.merge(Serialized::default("handler.timeout_seconds", timeout));
        }
        figment.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_flag_requires_handler() {
        let result = Cli::try_parse_from(["statewatch", "--channel", "#alerts"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_credential_is_rejected() {
        let cli = Cli::try_parse_from(["statewatch", "--handler", "ms-teams", "--token", "x"])
            .unwrap();
        let err = cli.overrides().unwrap_err();
        assert!(err
            .to_string()
            .contains("--token is not supported by the ms-teams handler"));
    }

    #[test]
    fn test_credentials_map_to_selected_handler() {
        let cli = Cli::try_parse_from([
            "statewatch",
            "--handler",
            "slack",
            "-t",
            "xoxb-1",
            "-c",
            "#ops",
        ])
        .unwrap();
        let overrides = cli.overrides().unwrap();
        assert!(overrides.contains(&("handler.name", "slack".to_string())));
        assert!(overrides.contains(&("handler.slack.token", "xoxb-1".to_string())));
        assert!(overrides.contains(&("handler.slack.channel", "#ops".to_string())));
    }

    #[test]
    fn test_smtp_flags_fill_recipient_and_relay() {
        let cli = Cli::try_parse_from([
            "statewatch",
            "--handler",
            "smtp",
            "-c",
            "ops@example.com",
            "-u",
            "smtp.example.com:587",
        ])
        .unwrap();
        let overrides = cli.overrides().unwrap();
        assert!(overrides.contains(&("handler.smtp.to", "ops@example.com".to_string())));
        assert!(overrides.contains(&("handler.smtp.smarthost", "smtp.example.com:587".to_string())));

        let cli = Cli::try_parse_from(["statewatch", "--handler", "smtp", "-t", "x"]).unwrap();
        assert!(cli.overrides().is_err());
    }

    #[test]
    fn test_unknown_handler_flag_is_rejected() {
        let cli = Cli::try_parse_from(["statewatch", "--handler", "Slack"]).unwrap();
        assert!(cli.overrides().is_err());
    }
}
