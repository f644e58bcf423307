//! Name-to-handler resolution.
//!
//! The set of handlers is closed: [`HandlerKind`] has one variant per
//! backend, and names are matched exactly (case-sensitive). Resolution
//! happens once at startup; nothing here is mutated afterwards.

use super::{
    cloudevent::CloudEvent, flock::Flock, lark::Lark, mattermost::Mattermost, msteam::MsTeams,
    slack::Slack, slackwebhook::SlackWebhook, smtp::Smtp, telegram::Telegram, webhook::Webhook,
    ConfigError, DefaultHandler, Handler,
};
use crate::config::Config;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Every handler this build knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Default,
    Slack,
    SlackWebhook,
    MsTeams,
    CloudEvent,
    Mattermost,
    Flock,
    Webhook,
    Lark,
    Telegram,
    Smtp,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 11] = [
        HandlerKind::Default,
        HandlerKind::Slack,
        HandlerKind::SlackWebhook,
        HandlerKind::MsTeams,
        HandlerKind::CloudEvent,
        HandlerKind::Mattermost,
        HandlerKind::Flock,
        HandlerKind::Webhook,
        HandlerKind::Lark,
        HandlerKind::Telegram,
        HandlerKind::Smtp,
    ];

    /// The registry name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Default => "default",
            HandlerKind::Slack => "slack",
            HandlerKind::SlackWebhook => "slackwebhook",
            HandlerKind::MsTeams => "ms-teams",
            HandlerKind::CloudEvent => "cloudevent",
            HandlerKind::Mattermost => "mattermost",
            HandlerKind::Flock => "flock",
            HandlerKind::Webhook => "webhook",
            HandlerKind::Lark => "lark",
            HandlerKind::Telegram => "telegram",
            HandlerKind::Smtp => "smtp",
        }
    }

    /// Constructs an uninitialized handler of this kind.
    pub fn build(self) -> Box<dyn Handler> {
        match self {
            HandlerKind::Default => Box::new(DefaultHandler),
            HandlerKind::Slack => Box::<Slack>::default(),
            HandlerKind::SlackWebhook => Box::<SlackWebhook>::default(),
            HandlerKind::MsTeams => Box::<MsTeams>::default(),
            HandlerKind::CloudEvent => Box::<CloudEvent>::default(),
            HandlerKind::Mattermost => Box::<Mattermost>::default(),
            HandlerKind::Flock => Box::<Flock>::default(),
            HandlerKind::Webhook => Box::<Webhook>::default(),
            HandlerKind::Lark => Box::<Lark>::default(),
            HandlerKind::Telegram => Box::<Telegram>::default(),
            HandlerKind::Smtp => Box::<Smtp>::default(),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = RegistryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        HandlerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| RegistryError::UnknownHandler {
                name: name.to_string(),
            })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown handler {name:?}, expected one of: {}", supported_names())]
    UnknownHandler { name: String },
}

fn supported_names() -> String {
    HandlerKind::ALL
        .iter()
        .map(HandlerKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Anything that keeps the process from reaching its event loop.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Looks up `name` and returns a fresh, uninitialized handler.
pub fn resolve(name: &str) -> Result<Box<dyn Handler>, RegistryError> {
    let kind: HandlerKind = name.parse()?;
    Ok(kind.build())
}

/// Resolves `name` and initializes the handler from `config`.
pub fn init_handler(name: &str, config: &Config) -> Result<Box<dyn Handler>, SetupError> {
    let mut handler = resolve(name)?;
    handler.init(config)?;
    debug!(handler = handler.name(), "Handler initialized");
    Ok(handler)
}
