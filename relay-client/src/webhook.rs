//! Chat webhook client

use crate::error::Result;
use reqwest::Client;
use serde::Serialize;

/// Posts plain-text messages to chat webhooks
///
/// The payload is `{"text": ...}`, which Slack and Google Chat both accept.
#[derive(Debug, Clone, Default)]
pub struct WebhookClient {
    client: Client,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Send a message to a webhook URL
    ///
    /// # Arguments
    /// * `url` - The webhook URL
    /// * `text` - Message text
    pub async fn post_text(&self, url: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(&TextMessage { text })
            .send()
            .await?;

        crate::check_status(response).await?;
        Ok(())
    }
}
