//! Sends events to a Telegram chat through the Bot API.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::StatemonitorEvent;
use crate::message::get_title;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const TELEGRAM_ERR_MSG: &str = "You need to set both telegram token and channel,
using \"--token/-t\" and \"--channel/-c\", or using environment variables:

export KW_TELEGRAM_TOKEN=telegram_token
export KW_TELEGRAM_CHANNEL=telegram_channel

Command line flags will override environment variables
";

#[derive(Debug, Serialize, PartialEq)]
pub struct SendMessage<'a> {
    pub chat_id: &'a str,
    pub text: String,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram bot handler.
#[derive(Debug, Default)]
pub struct Telegram {
    token: String,
    channel: String,
    title: String,
    api_url: String,
    client: Client,
}

/// Escapes the characters legacy Markdown mode treats as entity markers.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '[' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Telegram {
    pub fn payload(&self, event: &StatemonitorEvent) -> SendMessage<'_> {
        let mut text = format!("*{}*\n", escape_markdown(&self.title));
        for (name, value) in event.facts() {
            text.push_str(&format!("*{}*: {}\n", name, escape_markdown(value)));
        }
        if !event.diff_marshalled.is_empty() {
            text.push_str(&format!("```\n{}\n```", event.diff_marshalled));
        }
        SendMessage {
            chat_id: &self.channel,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        }
    }

    /// Strips the request URL, which embeds the bot token, from `err`.
    fn redact(&self, err: DeliveryError) -> DeliveryError {
        match err {
            DeliveryError::Transport { source, .. } => DeliveryError::Transport {
                url: format!("{}/bot<redacted>/sendMessage", self.api_url),
                source: source.without_url(),
            },
            DeliveryError::ReadBody(source) => DeliveryError::ReadBody(source.without_url()),
            other => other,
        }
    }
}

#[async_trait]
impl Handler for Telegram {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let section = &config.handler.telegram;
        self.token = env_or(&section.token, "KW_TELEGRAM_TOKEN");
        self.channel = env_or(&section.channel, "KW_TELEGRAM_CHANNEL");
        self.title = get_title(&config.message.title, "KW_TELEGRAM_TITLE");
        self.api_url = section.api_url.trim_end_matches('/').to_string();

        if self.token.is_empty() || self.channel.is_empty() {
            return Err(ConfigError::missing(
                "telegram",
                "Missing telegram token or channel",
                TELEGRAM_ERR_MSG,
            ));
        }
        self.client = transport::build(
            "telegram",
            transport::builder(config.handler.timeout_seconds),
        )?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let response = transport::post_json(&self.client, &url, &self.payload(event))
            .await
            .map_err(|e| self.redact(e))?;
        let body = transport::read_body(response, transport::is_success)
            .await
            .map_err(|e| self.redact(e))?;
        let reply: ApiResponse = serde_json::from_str(&body).map_err(DeliveryError::Decode)?;
        if !reply.ok {
            return Err(DeliveryError::Rejected {
                reason: reply
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{closed_port_url, event};
    use serde_json::json;
    use serial_test::serial;
    use std::env;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn clear_env() {
        env::remove_var("KW_TELEGRAM_TOKEN");
        env::remove_var("KW_TELEGRAM_CHANNEL");
        env::remove_var("KW_TELEGRAM_TITLE");
    }

    fn config(api_url: &str) -> Config {
        let mut config = Config::default();
        config.handler.telegram.token = "123:abc".to_string();
        config.handler.telegram.channel = "-10042".to_string();
        config.handler.telegram.api_url = api_url.to_string();
        config
    }

    #[test]
    #[serial]
    fn test_init_requires_token_and_channel() {
        clear_env();
        let err = Telegram::default().init(&Config::default()).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("\nMissing telegram token or channel\n"));
        assert!(Telegram::default().init(&config("https://api.telegram.org")).is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_deliver() {
        clear_env();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "-10042", "parse_mode": "Markdown" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let mut handler = Telegram::default();
        handler.init(&config(&server.uri())).unwrap();
        assert!(handler.deliver(&event("Danger")).await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_transport_error_hides_token() {
        clear_env();
        let mut handler = Telegram::default();
        handler.init(&config(&closed_port_url())).unwrap();

        let err = handler.deliver(&event("Normal")).await.unwrap_err();
        assert!(!err.to_string().contains("123:abc"));
    }

    #[tokio::test]
    #[serial]
    async fn test_read_body_error_hides_token() {
        clear_env();
        let mut handler = Telegram::default();
        handler.init(&config(&closed_port_url())).unwrap();
        let url = format!("{}/bot123:abc/sendMessage", closed_port_url());
        let source = Client::new().post(&url).send().await.unwrap_err();
        assert!(source.to_string().contains("123:abc"));

        let err = handler.redact(DeliveryError::ReadBody(source));

        assert!(matches!(err, DeliveryError::ReadBody(_)));
        assert!(!err.to_string().contains("123:abc"));
    }

    #[test]
    fn test_markdown_markers_are_escaped() {
        let mut handler = Telegram::default();
        handler.title = "prod_cluster *eu*".to_string();
        handler.channel = "-10042".to_string();
        let mut e = event("Normal");
        e.name = "web_[v2]".to_string();

        let text = handler.payload(&e).text;

        assert!(text.starts_with("*prod\\_cluster \\*eu\\**\n"));
        assert!(text.contains("*Name*: web\\_\\[v2]\n"));
        // The diff sits in a code block and is left as is.
        assert!(text.ends_with("```\n-image: nginx:1.0\n+image: nginx:1.1\n```"));
    }
}
