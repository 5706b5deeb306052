//! The notification channel seam.
//!
//! A channel is a best-effort delivery mechanism: its failure is recorded in
//! the fulfillment report, never escalated. Channels resolve their own
//! native address for a [`Party`] (email channels want an email address,
//! chat channels want an MSISDN) so the orchestrator can fan out without
//! knowing any channel's addressing scheme.

use async_trait::async_trait;

use duka_core::Msisdn;

/// Errors from a single notification dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// HTTP transport error reaching the channel provider.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// A party reachable by notifications — the paying customer or the shop
/// owner. Either contact field may be absent; a channel that cannot
/// address a party skips it.
#[derive(Debug, Clone, Default)]
pub struct Party {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<Msisdn>,
}

/// A document attached to a notification (channels that cannot carry
/// attachments ignore it).
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A composed notification, addressed in a channel's native scheme.
#[derive(Debug, Clone)]
pub struct Message {
    /// Channel-native address (email address or MSISDN digits).
    pub to: String,
    pub subject: String,
    /// Plain-text body; every channel can carry this.
    pub body: String,
    /// Rich HTML body for channels that support it (email).
    pub html: Option<String>,
    pub attachment: Option<Attachment>,
}

/// A best-effort notification delivery mechanism.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Stable channel name for reports and logs (e.g. `"email"`).
    fn name(&self) -> &'static str;

    /// The channel-native address of a party, if the party is reachable on
    /// this channel.
    fn address_of(&self, party: &Party) -> Option<String>;

    /// Deliver one message. Each dispatch is independent — implementations
    /// must not batch or reorder across calls.
    async fn send(&self, message: &Message) -> Result<(), ChannelError>;
}
