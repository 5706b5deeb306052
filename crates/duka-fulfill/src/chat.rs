//! Chat messaging channel (WhatsApp Graph REST).
//!
//! Text messages only. Carrying the invoice as a document requires a
//! publicly hosted media URL, which this deployment does not have — the
//! invoice travels by email, the chat message carries the summary.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::channel::{ChannelError, Message, NotificationChannel, Party};

/// Configuration for the WhatsApp chat channel.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Graph API base URL (version included); overridable for tests.
    pub base_url: String,
    pub token: String,
    /// The business phone-number id messages are sent from.
    pub phone_id: String,
    /// Request timeout in seconds (default: 15).
    pub timeout_secs: u64,
}

impl ChatConfig {
    pub fn new(token: impl Into<String>, phone_id: impl Into<String>) -> Self {
        Self {
            base_url: "https://graph.facebook.com/v17.0".to_string(),
            token: token.into(),
            phone_id: phone_id.into(),
            timeout_secs: 15,
        }
    }
}

/// WhatsApp-backed chat channel.
pub struct ChatChannel {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatChannel {
    pub fn new(config: ChatConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Api {
                endpoint: "client".to_string(),
                status: 0,
                body: format!("failed to build HTTP client: {e}"),
            })?;
        let config = ChatConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationChannel for ChatChannel {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn address_of(&self, party: &Party) -> Option<String> {
        party.phone.as_ref().map(|p| p.as_str().to_string())
    }

    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let endpoint = format!("{}/{}/messages", self.config.base_url, self.config.phone_id);

        let body = ChatSend {
            messaging_product: "whatsapp",
            to: message.to.clone(),
            r#type: "text",
            text: TextBody {
                body: message.body.clone(),
            },
        };

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                endpoint,
                status,
                body,
            });
        }

        tracing::debug!(to = %message.to, "chat message dispatched");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ChatSend {
    messaging_product: &'static str,
    to: String,
    r#type: &'static str,
    text: TextBody,
}

#[derive(Debug, Serialize)]
struct TextBody {
    body: String,
}
