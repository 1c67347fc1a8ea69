//! Sink that POSTs each delivery as JSON to an HTTP endpoint.
//!
//! Request body:
//!
//! ```json
//! {"kind": "direct",  "user_id": 42,    "text": "[news] ..."}
//! {"kind": "channel", "channel_id": 7,  "text": "<@42> [news] ..."}
//! ```
//!
//! The receiving bridge maps status codes back to delivery outcomes:
//! 2xx delivered, 404/410 recipient unknown, 403 recipient refuses messages.

use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    sink::{ChannelId, DeliverySink, UserId},
};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DeliveryRequest<'a> {
    Direct { user_id: UserId, text: &'a str },
    Channel { channel_id: ChannelId, text: &'a str },
}

impl DeliveryRequest<'_> {
    fn target(&self) -> String {
        match self {
            Self::Direct { user_id, .. } => format!("user {user_id}"),
            Self::Channel { channel_id, .. } => format!("channel {channel_id}"),
        }
    }
}

/// Delivery over an HTTP bridge.
pub struct WebhookSink {
    client: Client,
    url: String,
    token: Option<Secret<String>>,
}

impl WebhookSink {
    pub fn new(
        url: impl Into<String>,
        token: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::invalid_input("webhook url is empty"));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::external("build http client", e))?;
        Ok(Self { client, url, token })
    }

    async fn post(&self, request: DeliveryRequest<'_>) -> Result<()> {
        let target = request.target();
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::external(format!("post delivery for {target}"), e))?;

        let status = response.status();
        debug!(%target, %status, "webhook delivery response");
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let reason = if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{status}: {}", body.trim())
        };

        match (status.as_u16(), request) {
            (404 | 410, _) => Err(Error::unreachable(target, reason)),
            (403, DeliveryRequest::Channel { channel_id, .. }) => {
                Err(Error::not_messageable(channel_id))
            },
            (403, DeliveryRequest::Direct { .. }) => Err(Error::unreachable(target, reason)),
            _ => {
                warn!(%target, %status, "webhook rejected delivery");
                Err(Error::unavailable(format!("webhook returned {reason}")))
            },
        }
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<()> {
        self.post(DeliveryRequest::Direct { user_id, text }).await
    }

    async fn send_to_channel(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        self.post(DeliveryRequest::Channel { channel_id, text }).await
    }
}
