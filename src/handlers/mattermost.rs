//! Posts events to a Mattermost incoming webhook.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::{StatemonitorEvent, Status};
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const MATTERMOST_ERR_MSG: &str = "You need to set the Mattermost webhook url,
using \"--url/-u\", or using environment variables:

export KW_MATTERMOST_URL=mattermost_url

Channel and username are optional:

export KW_MATTERMOST_CHANNEL=mattermost_channel
export KW_MATTERMOST_USERNAME=mattermost_username

Command line flags will override environment variables
";

fn mattermost_color(status: Status) -> &'static str {
    match status {
        Status::Normal => "#00FF00",
        Status::Warning => "#FFFF00",
        Status::Danger => "#FF0000",
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MattermostMessage<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub channel: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub username: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub icon_url: &'a str,
    pub text: String,
    pub attachments: Vec<MattermostAttachment>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MattermostAttachment {
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub fields: Vec<MattermostField>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MattermostField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

/// Mattermost incoming-webhook handler.
#[derive(Debug, Default)]
pub struct Mattermost {
    channel: String,
    url: String,
    username: String,
    icon_url: String,
    title: String,
    client: Client,
}

impl Mattermost {
    pub fn payload(&self, event: &StatemonitorEvent) -> MattermostMessage<'_> {
        let text = if event.diff_marshalled.is_empty() {
            String::new()
        } else {
            format!("```\n{}\n```", event.diff_marshalled)
        };
        let fields = event
            .facts()
            .into_iter()
            .map(|(title, value)| MattermostField {
                title: title.to_string(),
                value: value.to_string(),
                short: true,
            })
            .collect();

        MattermostMessage {
            channel: &self.channel,
            username: &self.username,
            icon_url: &self.icon_url,
            text: event.message(),
            attachments: vec![MattermostAttachment {
                fallback: event.message(),
                color: event.severity().map(mattermost_color),
                title: self.title.clone(),
                text,
                fields,
            }],
        }
    }
}

#[async_trait]
impl Handler for Mattermost {
    fn name(&self) -> &'static str {
        "mattermost"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let section = &config.handler.mattermost;
        self.channel = env_or(&section.channel, "KW_MATTERMOST_CHANNEL");
        self.url = env_or(&section.url, "KW_MATTERMOST_URL");
        self.username = env_or(&section.username, "KW_MATTERMOST_USERNAME");
        self.icon_url = section.icon_url.clone();
        self.title = get_title(&config.message.title, "KW_MATTERMOST_TITLE");

        if self.url.is_empty() {
            return Err(ConfigError::missing(
                "mattermost",
                "Missing mattermost url",
                MATTERMOST_ERR_MSG,
            ));
        }
        self.client = transport::build(
            "mattermost",
            transport::builder(config.handler.timeout_seconds),
        )?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let response = transport::post_json(&self.client, &self.url, &self.payload(event)).await?;
        transport::read_body(response, transport::is_success).await?;
        Ok(())
    }
}
