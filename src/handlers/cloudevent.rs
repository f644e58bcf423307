//! Sends events to a CloudEvents sink in structured JSON mode.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::StatemonitorEvent;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const CLOUDEVENT_ERR_MSG: &str = "You need to set CloudEvent url
using \"--url/-u\" or using environment variables:

export KW_CLOUDEVENT_URL=url

Command line flags will override environment variables
";

const SPEC_VERSION: &str = "1.0";
const EVENT_TYPE: &str = "dev.statewatch.resource.change";
const EVENT_SOURCE: &str = "statewatch";
const CONTENT_TYPE: &str = "application/cloudevents+json";

#[derive(Debug, Serialize, PartialEq)]
pub struct CloudEventMessage<'a> {
    pub specversion: &'static str,
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub source: &'static str,
    pub subject: String,
    pub id: String,
    pub datacontenttype: &'static str,
    pub data: CloudEventMessageData<'a>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CloudEventMessageData<'a> {
    pub operation: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    pub namespace: &'a str,
    pub status: &'a str,
    pub description: String,
    pub diff: &'a str,
}

/// CloudEvents HTTP sink handler.
#[derive(Debug, Default)]
pub struct CloudEvent {
    url: String,
    client: Client,
}

/// `<namespace>/<kind>/<name>`, without the namespace segment when empty.
fn subject(event: &StatemonitorEvent) -> String {
    if event.namespace.is_empty() {
        format!("{}/{}", event.kind, event.name)
    } else {
        format!("{}/{}/{}", event.namespace, event.kind, event.name)
    }
}

/// Content-derived event id: equal events share an id.
fn event_id(event: &StatemonitorEvent) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [
        &event.kind,
        &event.namespace,
        &event.name,
        &event.reason,
        &event.status,
        &event.diff_marshalled,
    ] {
        hasher.update(part.as_bytes());
        hasher.update(&[0u8]);
    }
    hasher.finalize().to_hex().to_string()
}

impl CloudEvent {
    pub fn payload<'a>(&self, event: &'a StatemonitorEvent) -> CloudEventMessage<'a> {
        CloudEventMessage {
            specversion: SPEC_VERSION,
            event_type: EVENT_TYPE,
            source: EVENT_SOURCE,
            subject: subject(event),
            id: event_id(event),
            datacontenttype: "application/json",
            data: CloudEventMessageData {
                operation: &event.reason,
                kind: &event.kind,
                name: &event.name,
                namespace: &event.namespace,
                status: &event.status,
                description: event.message(),
                diff: &event.diff_marshalled,
            },
        }
    }
}

#[async_trait]
impl Handler for CloudEvent {
    fn name(&self) -> &'static str {
        "cloudevent"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        self.url = env_or(&config.handler.cloudevent.url, "KW_CLOUDEVENT_URL");
        if self.url.is_empty() {
            return Err(ConfigError::missing(
                "cloudevent",
                "Missing cloudevent url",
                CLOUDEVENT_ERR_MSG,
            ));
        }
        self.client = transport::build(
            "cloudevent",
            transport::builder(config.handler.timeout_seconds),
        )?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let message = self.payload(event);
        let response =
            transport::post_encoded(&self.client, &self.url, CONTENT_TYPE, &message).await?;
        transport::read_body(response, transport::is_success).await?;
        Ok(())
    }
}
