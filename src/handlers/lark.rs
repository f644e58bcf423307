//! Posts events to a Lark (Feishu) custom bot webhook.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::StatemonitorEvent;
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const LARK_ERR_MSG: &str = "You need to set the Lark webhook url,
using \"--url/-u\", or using environment variables:

export KW_LARK_WEBHOOKURL=lark_webhook_url

Command line flags will override environment variables
";

#[derive(Debug, Serialize, PartialEq)]
pub struct LarkMessage {
    pub msg_type: &'static str,
    pub content: LarkContent,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LarkContent {
    pub text: String,
}

/// Lark custom-bot handler.
#[derive(Debug, Default)]
pub struct Lark {
    webhook_url: String,
    title: String,
    client: Client,
}

impl Lark {
    pub fn payload(&self, event: &StatemonitorEvent) -> LarkMessage {
        let mut text = format!("{}\n{}", self.title, event.message());
        if !event.diff_marshalled.is_empty() {
            text.push('\n');
            text.push_str(&event.diff_marshalled);
        }
        LarkMessage {
            msg_type: "text",
            content: LarkContent { text },
        }
    }
}

#[async_trait]
impl Handler for Lark {
    fn name(&self) -> &'static str {
        "lark"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        self.webhook_url = env_or(&config.handler.lark.webhookurl, "KW_LARK_WEBHOOKURL");
        if self.webhook_url.is_empty() {
            return Err(ConfigError::missing(
                "lark",
                "Missing lark webhook url",
                LARK_ERR_MSG,
            ));
        }
        self.title = get_title(&config.message.title, "KW_LARK_TITLE");
        self.client = transport::build("lark", transport::builder(config.handler.timeout_seconds))?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let response =
            transport::post_json(&self.client, &self.webhook_url, &self.payload(event)).await?;
        transport::read_body(response, transport::is_success).await?;
        Ok(())
    }
}
