//! Shared application state.

use std::sync::Arc;

use duka_fulfill::{
    ChatChannel, ChatConfig, EmailChannel, EmailConfig, Orchestrator, Party, TextInvoiceRenderer,
};
use duka_gateway::DarajaClient;
use duka_store::{CorrelationStore, InMemoryStore};

use crate::config::AppConfig;

/// Application state shared across request tasks.
///
/// Cheaply cloneable — everything inside is behind an `Arc`. The store is
/// the only shared mutable resource; gateway client and orchestrator are
/// immutable after construction.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CorrelationStore>,
    pub gateway: Arc<DarajaClient>,
    pub orchestrator: Arc<Orchestrator>,
    /// Account reference shown on the payer's STK prompt.
    pub account_reference: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CorrelationStore>,
        gateway: Arc<DarajaClient>,
        orchestrator: Arc<Orchestrator>,
        account_reference: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            orchestrator,
            account_reference: account_reference.into(),
        }
    }

    /// Wire the full production state from configuration: in-memory store,
    /// Daraja client, and an orchestrator with every configured channel.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let gateway = Arc::new(DarajaClient::new(config.gateway.clone())?);

        let owner = Party {
            name: config.brand_name.clone(),
            email: config.owner_email.clone(),
            phone: config.owner_phone.clone(),
        };
        let renderer = Arc::new(TextInvoiceRenderer::new(config.brand_name.clone()));
        let mut orchestrator = Orchestrator::new(config.brand_name.clone(), owner, renderer);

        match &config.email {
            Some(settings) => {
                let channel = EmailChannel::new(EmailConfig::new(
                    settings.api_key.clone(),
                    settings.from_email.clone(),
                    config.brand_name.clone(),
                ))?;
                orchestrator = orchestrator.with_channel(Arc::new(channel));
            }
            None => tracing::warn!("email channel not configured; invoices will not be emailed"),
        }

        match &config.chat {
            Some(settings) => {
                let channel = ChatChannel::new(ChatConfig::new(
                    settings.token.clone(),
                    settings.phone_id.clone(),
                ))?;
                orchestrator = orchestrator.with_channel(Arc::new(channel));
            }
            None => tracing::warn!("chat channel not configured; order summaries will not be sent"),
        }

        Ok(Self::new(
            Arc::new(InMemoryStore::new()),
            gateway,
            Arc::new(orchestrator),
            config.account_reference.clone(),
        ))
    }
}
