//! Posts events to a Slack channel through the bot Web API.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::{StatemonitorEvent, Status};
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SLACK_ERR_MSG: &str = "You need to set both slack token and channel for slack notify,
using \"--token/-t\" and \"--channel/-c\", or using environment variables:

export KW_SLACK_TOKEN=slack_token
export KW_SLACK_CHANNEL=slack_channel

Command line flags will override environment variables
";

fn slack_color(status: Status) -> &'static str {
    match status {
        Status::Normal => "good",
        Status::Warning => "warning",
        Status::Danger => "danger",
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SlackMessage<'a> {
    pub channel: &'a str,
    pub as_user: bool,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub fallback: String,
    pub title: String,
    pub text: String,
    pub fields: Vec<AttachmentField>,
    pub mrkdwn_in: Vec<&'static str>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Slack bot handler.
#[derive(Debug, Default)]
pub struct Slack {
    token: String,
    channel: String,
    title: String,
    api_url: String,
    client: Client,
}

impl Slack {
    /// Builds the `chat.postMessage` body for `event`.
    pub fn payload(&self, event: &StatemonitorEvent) -> SlackMessage<'_> {
        let mut text = event.message();
        if !event.diff_marshalled.is_empty() {
            text.push_str(&format!("\n```\n{}\n```", event.diff_marshalled));
        }

        let fields = event
            .facts()
            .into_iter()
            .map(|(title, value)| AttachmentField {
                title: title.to_string(),
                value: value.to_string(),
                short: true,
            })
            .collect();

        SlackMessage {
            channel: &self.channel,
            as_user: true,
            attachments: vec![Attachment {
                color: event.severity().map(slack_color),
                fallback: event.message(),
                title: self.title.clone(),
                text,
                fields,
                mrkdwn_in: vec!["text", "fields"],
            }],
        }
    }
}

#[async_trait]
impl Handler for Slack {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let slack = &config.handler.slack;
        self.token = env_or(&slack.token, "KW_SLACK_TOKEN");
        self.channel = env_or(&slack.channel, "KW_SLACK_CHANNEL");
        self.title = get_title(&config.message.title, "KW_SLACK_TITLE");
        self.api_url = slack.api_url.trim_end_matches('/').to_string();

        if self.token.is_empty() || self.channel.is_empty() {
            return Err(ConfigError::missing(
                "slack",
                "Missing slack token or channel",
                SLACK_ERR_MSG,
            ));
        }

        self.client = transport::build("slack", transport::builder(config.handler.timeout_seconds))?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let body = serde_json::to_vec(&self.payload(event)).map_err(DeliveryError::Encode)?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|source| DeliveryError::Transport {
                url: url.clone(),
                source,
            })?;
        let body = transport::read_body(response, transport::is_success).await?;
        let reply: PostMessageResponse =
            serde_json::from_str(&body).map_err(DeliveryError::Decode)?;

        if !reply.ok {
            return Err(DeliveryError::Rejected {
                reason: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        debug!(
            channel = reply.channel.as_deref().unwrap_or_default(),
            ts = reply.ts.as_deref().unwrap_or_default(),
            "Slack accepted message"
        );
        Ok(())
    }
}
