//! Posts events as plain JSON to an arbitrary HTTP endpoint.

use super::{transport, ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::StatemonitorEvent;
use async_trait::async_trait;
use reqwest::{Certificate, Client};
use serde::Serialize;
use std::fs;

const WEBHOOK_ERR_MSG: &str = "You need to set Webhook url,
using \"--url/-u\", or using environment variables:

export KW_WEBHOOK_URL=webhook_url

An optional CA certificate can be trusted with:

export KW_WEBHOOK_CERT=/path/to/ca.pem

Command line flags will override environment variables
";

#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookMessage<'a> {
    pub eventmeta: EventMeta<'a>,
    pub text: String,
    pub diff: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EventMeta<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub namespace: &'a str,
    pub reason: &'a str,
    pub status: &'a str,
}

/// Generic JSON webhook handler.
#[derive(Debug, Default)]
pub struct Webhook {
    url: String,
    client: Client,
}

impl Webhook {
    pub fn payload<'a>(&self, event: &'a StatemonitorEvent) -> WebhookMessage<'a> {
        WebhookMessage {
            eventmeta: EventMeta {
                kind: &event.kind,
                name: &event.name,
                namespace: &event.namespace,
                reason: &event.reason,
                status: &event.status,
            },
            text: event.message(),
            diff: &event.diff_marshalled,
        }
    }
}

fn load_certificate(path: &str) -> Result<Certificate, ConfigError> {
    let pem = fs::read(path).map_err(|e| ConfigError::Certificate {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Certificate::from_pem(&pem).map_err(|e| ConfigError::Certificate {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Handler for Webhook {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let section = &config.handler.webhook;
        self.url = env_or(&section.url, "KW_WEBHOOK_URL");
        if self.url.is_empty() {
            return Err(ConfigError::missing(
                "webhook",
                "Missing webhook url",
                WEBHOOK_ERR_MSG,
            ));
        }

        let mut builder = transport::builder(config.handler.timeout_seconds);
        let cert = env_or(&section.cert, "KW_WEBHOOK_CERT");
        if !cert.is_empty() {
            builder = builder.add_root_certificate(load_certificate(&cert)?);
        }
        if section.tls_skip {
            builder = builder.danger_accept_invalid_certs(true);
        }
        self.client = transport::build("webhook", builder)?;
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let response = transport::post_json(&self.client, &self.url, &self.payload(event)).await?;
        transport::read_body(response, transport::is_success).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::event;
    use serde_json::json;
    use serial_test::serial;
    use std::env;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    #[serial]
    fn test_init_requires_url() {
        env::remove_var("KW_WEBHOOK_URL");
        env::remove_var("KW_WEBHOOK_CERT");
        let err = Webhook::default().init(&Config::default()).unwrap_err();
        assert!(err.to_string().starts_with("\nMissing webhook url\n"));
    }

    #[test]
    #[serial]
    fn test_init_rejects_bad_certificate() {
        env::remove_var("KW_WEBHOOK_CERT");
        let mut config = Config::default();
        config.handler.webhook.url = "https://example.com/hook".to_string();
        config.handler.webhook.cert = "/nonexistent/ca.pem".to_string();
        let err = Webhook::default().init(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Certificate { ref path, .. } if path == "/nonexistent/ca.pem"));
    }

    #[tokio::test]
    async fn test_deliver_wire_format() {
        // Arrange
        let server = MockServer::start().await;
        let mut config = Config::default();
        config.handler.webhook.url = format!("{}/events", server.uri());
        let mut handler = Webhook::default();
        handler.init(&config).unwrap();

        Mock::given(method("POST"))
            .and(path("/events"))
            .and(body_json(json!({
                "eventmeta": {
                    "kind": "Deployment",
                    "name": "web",
                    "namespace": "prod",
                    "reason": "update",
                    "status": "Normal"
                },
                "text": "A `Deployment` in namespace `prod` has been `update`:\n`web`",
                "diff": "-image: nginx:1.0\n+image: nginx:1.1"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        // Act & Assert
        assert!(handler.deliver(&event("Normal")).await.is_ok());
    }
}
