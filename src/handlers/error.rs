//! Error types for handler setup and delivery.
//!
//! The two classes never mix: a [`ConfigError`] aborts startup, a
//! [`DeliveryError`] only ever reaches a log line.

use reqwest::StatusCode;
use thiserror::Error;

/// A handler could not be initialized from its configuration section.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is empty after applying environment fallbacks.
    #[error("\n{reason}\n\n{remediation}\n")]
    Missing {
        handler: &'static str,
        reason: &'static str,
        remediation: &'static str,
    },
    #[error("failed to build HTTP client for the {handler} handler: {source}")]
    HttpClient {
        handler: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid CA certificate {path}: {reason}")]
    Certificate { path: String, reason: String },
    #[error("invalid {handler} configuration: {reason}")]
    Invalid {
        handler: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing(
        handler: &'static str,
        reason: &'static str,
        remediation: &'static str,
    ) -> Self {
        ConfigError::Missing {
            handler,
            reason,
            remediation,
        }
    }
}

/// A single notification could not be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed encoding payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed decoding response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed sending to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed reading response body: {0}")]
    ReadBody(#[source] reqwest::Error),
    #[error("failed composing email: {0}")]
    Compose(#[source] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Smtp(#[source] lettre::transport::smtp::Error),
    /// The endpoint answered 2xx but reported a failure in its body.
    #[error("request rejected: {reason}")]
    Rejected { reason: String },
}
