//! Outbound message delivery

use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::discord::DiscordMessage;
use crate::error::{RelayError, Result};

/// Timeout for a single outbound POST.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for posting messages to incoming-webhook URLs.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: Client,
}

impl DeliveryClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(DeliveryClient { client })
    }

    /// Posts the messages in order, stopping at the first failure.
    ///
    /// The destination acknowledges a message with `204 No Content`;
    /// any other status fails the delivery and the remaining messages
    /// are not sent.
    pub async fn deliver(&self, messages: &[DiscordMessage], webhook_url: &str) -> Result<()> {
        for message in messages {
            // Transport errors carry the URL, and the URL embeds the
            // webhook token; strip it before the error leaves here.
            let response = self
                .client
                .post(webhook_url)
                .json(message)
                .send()
                .await
                .map_err(|e| RelayError::Request(e.without_url()))?;
            let status = response.status();
            if status != StatusCode::NO_CONTENT {
                let body = response.text().await.unwrap_or_default();
                return Err(RelayError::Delivery {
                    status: status.as_u16(),
                    body,
                });
            }
        }
        Ok(())
    }
}
