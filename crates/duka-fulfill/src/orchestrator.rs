//! The fulfillment fan-out.
//!
//! Invoked at most once per correlation key — the caller's check-and-set
//! guard enforces that; nothing here re-checks it. What this module
//! guarantees is the *all-attempted* policy: every configured channel is
//! tried for both the customer and the owner, failures are recorded, and
//! the report is returned purely for observability.

use std::sync::Arc;

use serde::Serialize;

use duka_core::{CorrelationKey, Msisdn, Order};

use crate::channel::{Message, NotificationChannel, Party};
use crate::invoice::{Invoice, InvoiceRenderer};

/// Everything fulfillment needs about one confirmed payment: the order
/// captured at initiation plus the confirmed outcome fields.
#[derive(Debug, Clone)]
pub struct FulfillmentContext {
    pub correlation_key: CorrelationKey,
    pub order: Order,
    /// Confirmed amount in whole shillings (from the callback, not the
    /// initiation — the gateway's word is authoritative).
    pub amount_kes: u64,
    pub receipt_number: Option<String>,
    pub payer_phone: Option<String>,
}

/// Which party a dispatch addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    Customer,
    Owner,
}

/// Outcome of a single channel dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "outcome")]
pub enum DispatchResult {
    /// The provider accepted the message.
    Sent,
    /// The party has no address on this channel; nothing was attempted.
    Skipped { reason: String },
    /// The dispatch was attempted and failed; recorded, never escalated.
    Failed { error: String },
}

/// One channel × recipient outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    pub recipient: Recipient,
    #[serde(flatten)]
    pub result: DispatchResult,
}

/// Aggregated per-channel outcomes of one fulfillment run.
///
/// Observability only — a fully failed report still leaves the payment
/// `paid`.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentReport {
    pub correlation_key: CorrelationKey,
    pub invoice_rendered: bool,
    pub outcomes: Vec<ChannelOutcome>,
}

impl FulfillmentReport {
    pub fn sent_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result == DispatchResult::Sent)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, DispatchResult::Failed { .. }))
            .count()
    }
}

/// The fulfillment orchestrator: renderer + channels + owner contact.
pub struct Orchestrator {
    brand_name: String,
    owner: Party,
    renderer: Arc<dyn InvoiceRenderer>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl Orchestrator {
    pub fn new(
        brand_name: impl Into<String>,
        owner: Party,
        renderer: Arc<dyn InvoiceRenderer>,
    ) -> Self {
        Self {
            brand_name: brand_name.into(),
            owner,
            renderer,
            channels: Vec::new(),
        }
    }

    /// Register a notification channel. Channels are attempted in
    /// registration order.
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Run fulfillment for one confirmed payment.
    ///
    /// Infallible by contract: rendering and dispatch failures end up in
    /// the report, never in a `Result`.
    pub async fn fulfill(&self, ctx: &FulfillmentContext) -> FulfillmentReport {
        let invoice = match self.renderer.render(ctx) {
            Ok(invoice) => Some(invoice),
            Err(e) => {
                // The order is still paid; only the attachment is lost.
                tracing::error!(
                    correlation_key = %ctx.correlation_key,
                    "invoice rendering failed: {e}"
                );
                None
            }
        };

        let customer = customer_party(&ctx.order);
        let mut outcomes = Vec::new();

        for channel in &self.channels {
            for (recipient, party) in [
                (Recipient::Customer, &customer),
                (Recipient::Owner, &self.owner),
            ] {
                let outcome = self
                    .dispatch(channel.as_ref(), recipient, party, ctx, invoice.as_ref())
                    .await;
                outcomes.push(outcome);
            }
        }

        let report = FulfillmentReport {
            correlation_key: ctx.correlation_key.clone(),
            invoice_rendered: invoice.is_some(),
            outcomes,
        };
        tracing::info!(
            correlation_key = %ctx.correlation_key,
            sent = report.sent_count(),
            failed = report.failed_count(),
            invoice_rendered = report.invoice_rendered,
            "fulfillment run complete"
        );
        report
    }

    async fn dispatch(
        &self,
        channel: &dyn NotificationChannel,
        recipient: Recipient,
        party: &Party,
        ctx: &FulfillmentContext,
        invoice: Option<&Invoice>,
    ) -> ChannelOutcome {
        let Some(to) = channel.address_of(party) else {
            return ChannelOutcome {
                channel: channel.name(),
                recipient,
                result: DispatchResult::Skipped {
                    reason: "no address for this channel".to_string(),
                },
            };
        };

        let message = match recipient {
            Recipient::Customer => self.customer_message(to, ctx, invoice),
            Recipient::Owner => self.owner_message(to, ctx, invoice),
        };

        let result = match channel.send(&message).await {
            Ok(()) => DispatchResult::Sent,
            Err(e) => {
                tracing::warn!(
                    correlation_key = %ctx.correlation_key,
                    channel = channel.name(),
                    ?recipient,
                    "notification dispatch failed: {e}"
                );
                DispatchResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        ChannelOutcome {
            channel: channel.name(),
            recipient,
            result,
        }
    }

    fn order_handle<'a>(&self, ctx: &'a FulfillmentContext) -> &'a str {
        ctx.order
            .order_id
            .as_deref()
            .unwrap_or(ctx.correlation_key.as_str())
    }

    /// Customer copy: thanks, total, invoice notice. Contact details of the
    /// customer are not echoed back at them.
    fn customer_message(
        &self,
        to: String,
        ctx: &FulfillmentContext,
        invoice: Option<&Invoice>,
    ) -> Message {
        let order_id = self.order_handle(ctx);
        let name = &ctx.order.customer.name;
        let total = ctx.order.total().max(ctx.amount_kes);

        let body = format!(
            "Hi {name}! Your order {order_id} is confirmed. \
             We received your payment of KES {} — thank you for shopping with {}.",
            ctx.amount_kes, self.brand_name
        );
        let html = format!(
            "<div style=\"font-family: Arial, Helvetica, sans-serif;\">\
             <h2>Thank you for your order — {brand}</h2>\
             <p>Hello {name},</p>\
             <p>Your order <strong>{order_id}</strong> is confirmed and paid.</p>\
             <p>Order total: <strong>KES {total}</strong></p>\
             <p>Your invoice is attached.</p>\
             <p style=\"margin-top:18px\">With warm regards,<br/>{brand}</p>\
             </div>",
            brand = self.brand_name,
        );

        Message {
            to,
            subject: format!("{} — Your Order {order_id}", self.brand_name),
            body,
            html: Some(html),
            attachment: invoice.map(Invoice::as_attachment),
        }
    }

    /// Owner copy: distinct content carrying the customer's contact details
    /// and the gateway receipt.
    fn owner_message(
        &self,
        to: String,
        ctx: &FulfillmentContext,
        invoice: Option<&Invoice>,
    ) -> Message {
        let order_id = self.order_handle(ctx);
        let customer = &ctx.order.customer;
        let receipt = ctx.receipt_number.as_deref().unwrap_or("unknown");
        let payer = ctx.payer_phone.as_deref().unwrap_or("unknown");

        let body = format!(
            "New order {order_id} — KES {}. Receipt {receipt}, payer {payer}. \
             Customer: {}, {}, {}.",
            ctx.amount_kes,
            customer.name,
            customer.phone.as_deref().unwrap_or("-"),
            customer.email.as_deref().unwrap_or("-"),
        );
        let html = format!(
            "<p>New order <strong>{order_id}</strong> paid: KES {} \
             (receipt {receipt}, payer {payer}).</p>\
             <p>Customer: {} — phone {}, email {}, address {}.</p>\
             <p>Invoice attached.</p>",
            ctx.amount_kes,
            customer.name,
            customer.phone.as_deref().unwrap_or("-"),
            customer.email.as_deref().unwrap_or("-"),
            customer.address.as_deref().unwrap_or("-"),
        );

        Message {
            to,
            subject: format!("New order received — {order_id}"),
            body,
            html: Some(html),
            attachment: invoice.map(Invoice::as_attachment),
        }
    }
}

/// The customer as a notification [`Party`], phone canonicalized when it
/// parses (an unparseable phone just means the chat channel skips them).
fn customer_party(order: &Order) -> Party {
    Party {
        name: order.customer.name.clone(),
        email: order.customer.email.clone(),
        phone: order
            .customer
            .phone
            .as_deref()
            .and_then(|raw| Msisdn::new(raw).ok()),
    }
}
