//! Chat-channel notifier: posts a single text block to a webhook.

use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{DeliveryReport, status_failure, transport_failure};
use crate::config::ChannelSettings;

const SERVICE: &str = "Chat channel";
const TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the client identifier.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";
/// Header carrying the client secret.
pub const CLIENT_SECRET_HEADER: &str = "X-Client-Secret";

/// Sends messages to the configured chat room.
pub struct ChannelNotifier {
    http: Client,
    settings: ChannelSettings,
}

impl ChannelNotifier {
    /// Build a notifier from settings; missing credentials are reported at send time.
    pub fn new(settings: &ChannelSettings) -> Self {
        let http = Client::builder()
            .user_agent("tf-digest/notify")
            .timeout(TIMEOUT)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(error = %error, "Falling back to default HTTP client for channel");
                Client::new()
            });
        Self {
            http,
            settings: settings.clone(),
        }
    }

    /// Whether the webhook and both credentials are configured.
    pub fn is_configured(&self) -> bool {
        self.settings.webhook_url.is_some()
            && self.settings.client_id.is_some()
            && self.settings.client_secret.is_some()
    }

    /// Post `text` to the channel. One attempt, no retry.
    pub async fn notify(&self, text: &str) -> DeliveryReport {
        let ChannelSettings {
            webhook_url: Some(url),
            client_id: Some(client_id),
            client_secret: Some(client_secret),
        } = &self.settings
        else {
            tracing::debug!("Chat channel not configured; skipping notification");
            return DeliveryReport::not_configured(
                "Chat channel is not configured: set CHANNEL_WEBHOOK_URL, CHANNEL_CLIENT_ID and CHANNEL_CLIENT_SECRET",
            );
        };

        let response = match self
            .http
            .post(url)
            .header(CLIENT_ID_HEADER, client_id)
            .header(CLIENT_SECRET_HEADER, client_secret)
            .json(&json!({ "text": text }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return transport_failure(SERVICE, url, TIMEOUT, &error),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return status_failure(SERVICE, status, &body, "the webhook URL does not exist");
        }

        tracing::info!(chars = text.chars().count(), "Posted message to chat channel");
        DeliveryReport {
            success: true,
            message: "Message posted to the chat channel".into(),
            status: Some(status.as_u16()),
            ..DeliveryReport::default()
        }
    }
}
