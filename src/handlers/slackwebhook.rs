//! Posts events to a Slack incoming webhook.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::StatemonitorEvent;
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const SLACK_WEBHOOK_ERR_MSG: &str = "You need to set the slack webhook url for slack notify,
using \"--url/-u\", or using environment variables:

export KW_SLACK_WEBHOOK_URL=slack_webhook_url

Channel, username and emoji are optional:

export KW_SLACK_CHANNEL=slack_channel
export KW_SLACK_USERNAME=slack_username
export KW_SLACK_EMOJI=slack_emoji

Command line flags will override environment variables
";

#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookMessage<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub channel: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub username: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub icon_emoji: &'a str,
    pub text: String,
}

/// Slack incoming-webhook handler.
#[derive(Debug, Default)]
pub struct SlackWebhook {
    channel: String,
    username: String,
    emoji: String,
    webhook_url: String,
    title: String,
    client: Client,
}

impl SlackWebhook {
    pub fn payload(&self, event: &StatemonitorEvent) -> WebhookMessage<'_> {
        let mut text = format!("*{}*\n{}", self.title, event.message());
        if !event.diff_marshalled.is_empty() {
            text.push_str(&format!("\n```\n{}\n```", event.diff_marshalled));
        }
        WebhookMessage {
            channel: &self.channel,
            username: &self.username,
            icon_emoji: &self.emoji,
            text,
        }
    }
}

#[async_trait]
impl Handler for SlackWebhook {
    fn name(&self) -> &'static str {
        "slackwebhook"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let section = &config.handler.slackwebhook;
        self.channel = env_or(&section.channel, "KW_SLACK_CHANNEL");
        self.username = env_or(&section.username, "KW_SLACK_USERNAME");
        self.emoji = env_or(&section.emoji, "KW_SLACK_EMOJI");
        self.webhook_url = env_or(&section.slackwebhookurl, "KW_SLACK_WEBHOOK_URL");
        self.title = get_title(&config.message.title, "KW_SLACKWEBHOOK_TITLE");

        if self.webhook_url.is_empty() {
            return Err(ConfigError::missing(
                "slackwebhook",
                "Missing slack webhook url",
                SLACK_WEBHOOK_ERR_MSG,
            ));
        }
        self.client = transport::build(
            "slackwebhook",
            transport::builder(config.handler.timeout_seconds),
        )?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let response =
            transport::post_json(&self.client, &self.webhook_url, &self.payload(event)).await?;
        transport::read_body(response, transport::is_success).await?;
        Ok(())
    }
}
