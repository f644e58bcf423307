//! Posts events to a Flock incoming webhook.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::{StatemonitorEvent, Status};
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const FLOCK_ERR_MSG: &str = "You need to set the Flock webhook url,
using \"--url/-u\", or using environment variables:

export KW_FLOCK_URL=flock_url

Command line flags will override environment variables
";

fn flock_color(status: Status) -> &'static str {
    match status {
        Status::Normal => "#00FF00",
        Status::Warning => "#ffc107",
        Status::Danger => "#ff0000",
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FlockMessage {
    pub notification: String,
    pub text: String,
    pub attachments: Vec<FlockMessageAttachment>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FlockMessageAttachment {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub views: FlockMessageAttachmentViews,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FlockMessageAttachmentViews {
    pub flockml: String,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the fact list and diff as FlockML.
fn flockml(event: &StatemonitorEvent) -> String {
    let mut body = String::from("<flockml>");
    for (name, value) in event.facts() {
        body.push_str(&format!("<b>{}:</b> {}<br/>", name, escape(value)));
    }
    if !event.diff_marshalled.is_empty() {
        body.push_str(&format!("<pre>{}</pre>", escape(&event.diff_marshalled)));
    }
    body.push_str("</flockml>");
    body
}

/// Flock incoming-webhook handler.
#[derive(Debug, Default)]
pub struct Flock {
    url: String,
    title: String,
    client: Client,
}

impl Flock {
    pub fn payload(&self, event: &StatemonitorEvent) -> FlockMessage {
        FlockMessage {
            notification: self.title.clone(),
            text: event.message(),
            attachments: vec![FlockMessageAttachment {
                title: self.title.clone(),
                color: event.severity().map(flock_color),
                views: FlockMessageAttachmentViews {
                    flockml: flockml(event),
                },
            }],
        }
    }
}

#[async_trait]
impl Handler for Flock {
    fn name(&self) -> &'static str {
        "flock"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        self.url = env_or(&config.handler.flock.url, "KW_FLOCK_URL");
        if self.url.is_empty() {
            return Err(ConfigError::missing("flock", "Missing flock url", FLOCK_ERR_MSG));
        }
        self.title = get_title(&config.message.title, "KW_FLOCK_TITLE");
        self.client = transport::build("flock", transport::builder(config.handler.timeout_seconds))?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let response = transport::post_json(&self.client, &self.url, &self.payload(event)).await?;
        transport::read_body(response, transport::is_success).await?;
        Ok(())
    }
}
