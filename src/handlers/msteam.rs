//! Posts events to a Microsoft Teams channel as legacy connector MessageCards.
//!
//! Card reference:
//! <https://docs.microsoft.com/en-us/outlook/actionable-messages/card-reference#card-fields>

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::{StatemonitorEvent, Status};
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

const MSTEAMS_ERR_MSG: &str = "You need to set the MS teams webhook URL,
using \"--url/-u\", or using environment variables:

export KW_MSTEAMS_WEBHOOKURL=webhook_url

Command line flags will override environment variables
";

const MESSAGE_TYPE: &str = "MessageCard";
const CONTEXT: &str = "http://schema.org/extensions";

fn teams_color(status: Status) -> &'static str {
    match status {
        Status::Normal => "2DC72D",
        Status::Warning => "DEFF22",
        Status::Danger => "8C1A1A",
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TeamsMessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    /// Always present; empty for statuses without a color.
    #[serde(rename = "themeColor")]
    pub theme_color: &'static str,
    pub summary: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub sections: Vec<TeamsMessageCardSection>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TeamsMessageCardSection {
    #[serde(rename = "activityTitle")]
    pub activity_title: String,
    pub facts: Vec<TeamsMessageCardSectionFact>,
    pub markdown: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TeamsMessageCardSectionFact {
    pub name: String,
    pub value: String,
}

/// Microsoft Teams incoming-webhook handler.
#[derive(Debug, Default)]
pub struct MsTeams {
    webhook_url: String,
    title: String,
    client: Client,
}

impl MsTeams {
    pub fn payload(&self, event: &StatemonitorEvent) -> TeamsMessageCard {
        let facts = event
            .facts()
            .into_iter()
            .map(|(name, value)| TeamsMessageCardSectionFact {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect();

        TeamsMessageCard {
            card_type: MESSAGE_TYPE,
            context: CONTEXT,
            theme_color: event.severity().map(teams_color).unwrap_or(""),
            // Teams rejects cards without a summary.
            summary: format!("{} notification received", self.title),
            title: self.title.clone(),
            text: event.diff_marshalled.clone(),
            sections: vec![TeamsMessageCardSection {
                activity_title: event.message(),
                facts,
                markdown: true,
            }],
        }
    }
}

#[async_trait]
impl Handler for MsTeams {
    fn name(&self) -> &'static str {
        "ms-teams"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let webhook_url = env_or(&config.handler.msteams.webhookurl, "KW_MSTEAMS_WEBHOOKURL");
        if webhook_url.is_empty() {
            return Err(ConfigError::missing(
                "ms-teams",
                "Missing MS teams webhook URL",
                MSTEAMS_ERR_MSG,
            ));
        }

        self.title = get_title(&config.message.title, "KW_MSTEAMS_TITLE");
        self.webhook_url = webhook_url;
        self.client = transport::build(
            "ms-teams",
            transport::builder(config.handler.timeout_seconds),
        )?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let card = self.payload(event);
        let response = transport::post_json(&self.client, &self.webhook_url, &card).await?;
        // Teams answers 200 with a body of "1"; anything else is a failure.
        transport::read_body(response, |status| status == StatusCode::OK).await?;
        Ok(())
    }
}
