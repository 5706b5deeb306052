//! Transactional email channel (SendGrid v3 REST).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::channel::{ChannelError, Message, NotificationChannel, Party};

/// Configuration for the SendGrid email channel.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SendGrid API base URL; overridable for tests.
    pub base_url: String,
    pub api_key: String,
    /// Verified sender address.
    pub from_email: String,
    /// Display name on outgoing mail (the brand).
    pub from_name: String,
    /// Request timeout in seconds (default: 15).
    pub timeout_secs: u64,
}

impl EmailConfig {
    pub fn new(
        api_key: impl Into<String>,
        from_email: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Self {
        Self {
            base_url: "https://api.sendgrid.com".to_string(),
            api_key: api_key.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
            timeout_secs: 15,
        }
    }
}

/// SendGrid-backed email channel with attachment support.
pub struct EmailChannel {
    client: reqwest::Client,
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Api {
                endpoint: "client".to_string(),
                status: 0,
                body: format!("failed to build HTTP client: {e}"),
            })?;
        let config = EmailConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn address_of(&self, party: &Party) -> Option<String> {
        party.email.clone()
    }

    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let endpoint = format!("{}/v3/mail/send", self.config.base_url);

        let attachments = message.attachment.as_ref().map(|att| {
            vec![MailAttachment {
                content: STANDARD.encode(&att.bytes),
                filename: att.filename.clone(),
                r#type: att.mime_type.to_string(),
                disposition: "attachment".to_string(),
            }]
        });

        let body = MailSend {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: message.to.clone(),
                }],
            }],
            from: Sender {
                email: self.config.from_email.clone(),
                name: self.config.from_name.clone(),
            },
            subject: message.subject.clone(),
            content: vec![match &message.html {
                Some(html) => Content {
                    r#type: "text/html".to_string(),
                    value: html.clone(),
                },
                None => Content {
                    r#type: "text/plain".to_string(),
                    value: message.body.clone(),
                },
            }],
            attachments,
        };

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
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

        tracing::debug!(to = %message.to, "email dispatched");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SendGrid v3 wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MailSend {
    personalizations: Vec<Personalization>,
    from: Sender,
    subject: String,
    content: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<Vec<MailAttachment>>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<Address>,
}

#[derive(Debug, Serialize)]
struct Address {
    email: String,
}

#[derive(Debug, Serialize)]
struct Sender {
    email: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct Content {
    r#type: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct MailAttachment {
    content: String,
    filename: String,
    r#type: String,
    disposition: String,
}
