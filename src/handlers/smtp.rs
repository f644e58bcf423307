//! Mails events through an SMTP relay.

use super::{ConfigError, DeliveryError, Handler};
use crate::config::{env_or, Config};
use crate::event::StatemonitorEvent;
use crate::message::get_title;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

const SMTP_ERR_MSG: &str = "You need to set the smtp recipient, sender and smarthost,
using \"--channel/-c\" for the recipient and \"--url/-u\" for the smarthost,
or using environment variables:

export KW_SMTP_TO=ops@example.com
export KW_SMTP_FROM=statewatch@example.com
export KW_SMTP_SMARTHOST=smtp.example.com:587

Relay authentication is optional:

export KW_SMTP_USERNAME=user
export KW_SMTP_PASSWORD=password

Command line flags will override environment variables
";

const DEFAULT_PORT: u16 = 25;

/// Subject and plain-text body of one notification mail.
#[derive(Debug, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// SMTP handler.
#[derive(Default)]
pub struct Smtp {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    title: String,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Smtp {
    pub fn payload(&self, event: &StatemonitorEvent) -> EmailContent {
        // Headers are single-line; the summary loses its markdown and line break.
        let summary = event.message().replace(":\n", " ").replace(['`', '\n'], "");

        let mut body = String::new();
        for (name, value) in event.facts() {
            body.push_str(&format!("{}: {}\n", name, value));
        }
        if !event.diff_marshalled.is_empty() {
            body.push('\n');
            body.push_str(&event.diff_marshalled);
            body.push('\n');
        }

        EmailContent {
            subject: format!("[{}] {}", self.title, summary),
            body,
        }
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid {
        handler: "smtp",
        reason,
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ConfigError> {
    address
        .trim()
        .parse()
        .map_err(|e| invalid(format!("bad address {address:?}: {e}")))
}

/// Splits `host[:port]`, defaulting to port 25.
fn split_smarthost(smarthost: &str) -> Result<(&str, u16), ConfigError> {
    match smarthost.rsplit_once(':') {
        Some((host, port)) => port
            .parse()
            .map(|port| (host, port))
            .map_err(|_| invalid(format!("bad smarthost port in {smarthost:?}"))),
        None => Ok((smarthost, DEFAULT_PORT)),
    }
}

#[async_trait]
impl Handler for Smtp {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn init(&mut self, config: &Config) -> Result<(), ConfigError> {
        let section = &config.handler.smtp;
        let to = env_or(&section.to, "KW_SMTP_TO");
        let from = env_or(&section.from, "KW_SMTP_FROM");
        let smarthost = env_or(&section.smarthost, "KW_SMTP_SMARTHOST");
        let username = env_or(&section.username, "KW_SMTP_USERNAME");
        let password = env_or(&section.password, "KW_SMTP_PASSWORD");
        self.title = get_title(&config.message.title, "KW_SMTP_TITLE");

        if to.is_empty() || from.is_empty() || smarthost.is_empty() {
            return Err(ConfigError::missing(
                "smtp",
                "Missing smtp to, from or smarthost",
                SMTP_ERR_MSG,
            ));
        }

        self.from = Some(parse_mailbox(&from)?);
        self.to = to
            .split(',')
            .filter(|address| !address.trim().is_empty())
            .map(parse_mailbox)
            .collect::<Result<_, _>>()?;

        let (host, port) = split_smarthost(&smarthost)?;
        let parameters =
            TlsParameters::new(host.to_string()).map_err(|e| invalid(e.to_string()))?;
        let tls = if section.require_tls {
            Tls::Required(parameters)
        } else {
            Tls::Opportunistic(parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .tls(tls)
            .timeout(Some(Duration::from_secs(config.handler.timeout_seconds)));
        if !username.is_empty() {
            builder = builder.credentials(Credentials::new(username, password));
        }
        self.transport = Some(builder.build());
        Ok(())
    }

    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            return Err(DeliveryError::Rejected {
                reason: "smtp handler used before init".to_string(),
            });
        };

        let content = self.payload(event);
        let mut message = Message::builder().from(from.clone());
        for recipient in &self.to {
            message = message.to(recipient.clone());
        }
        let message = message
            .subject(content.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(content.body)
            .map_err(DeliveryError::Compose)?;

        transport.send(message).await.map_err(DeliveryError::Smtp)?;
        Ok(())
    }
}
