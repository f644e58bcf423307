//! HTTP plumbing shared by the webhook-style handlers.

use super::error::{ConfigError, DeliveryError};
use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Returns a client builder with the request timeout applied.
pub(crate) fn builder(timeout_seconds: u64) -> ClientBuilder {
    Client::builder().timeout(Duration::from_secs(timeout_seconds))
}

/// Builds a client, mapping failures to a startup error for `handler`.
pub(crate) fn build(handler: &'static str, builder: ClientBuilder) -> Result<Client, ConfigError> {
    builder
        .build()
        .map_err(|source| ConfigError::HttpClient { handler, source })
}

/// Encodes `payload` as JSON and POSTs it to `url`.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    payload: &T,
) -> Result<Response, DeliveryError> {
    post_encoded(client, url, "application/json", payload).await
}

/// Like [`post_json`] with an explicit content type.
pub(crate) async fn post_encoded<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    content_type: &str,
    payload: &T,
) -> Result<Response, DeliveryError> {
    let body = serde_json::to_vec(payload).map_err(DeliveryError::Encode)?;
    client
        .post(url)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .map_err(|source| DeliveryError::Transport {
            url: url.to_string(),
            source,
        })
}

/// Reads the body of an accepted response, or turns any other status into
/// [`DeliveryError::Status`] carrying the response body.
pub(crate) async fn read_body(
    response: Response,
    accept: fn(StatusCode) -> bool,
) -> Result<String, DeliveryError> {
    let status = response.status();
    let body = response.text().await.map_err(DeliveryError::ReadBody)?;
    if accept(status) {
        Ok(body)
    } else {
        Err(DeliveryError::Status { status, body })
    }
}

/// Accepts any 2xx status.
pub(crate) fn is_success(status: StatusCode) -> bool {
    status.is_success()
}
