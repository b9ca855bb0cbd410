//! Notification repository
//!
//! Delivers chat messages: batch reports and errors go to the configured
//! webhook, report announcements go to the webhook named by each message task.

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_client::WebhookClient;

/// Repository trait for outbound chat messages
///
/// Delivery is best-effort; callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a message to the runner's own webhook
    async fn notify(&self, text: &str) -> Result<()>;

    /// Sends a message to a specific webhook
    async fn send_to(&self, webhook: &str, text: &str) -> Result<()>;
}

/// Webhook implementation of Notifier
pub struct WebhookNotifier {
    client: WebhookClient,
    webhook_url: String,
}

impl WebhookNotifier {
    /// Creates a new webhook notifier
    ///
    /// # Arguments
    /// * `webhook_url` - Default destination for [`Notifier::notify`]
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: WebhookClient::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        self.send_to(&self.webhook_url, text).await
    }

    async fn send_to(&self, webhook: &str, text: &str) -> Result<()> {
        self.client
            .post_text(webhook, text)
            .await
            .context("Failed to post webhook message")
    }
}
