//! # duka-fulfill — Fulfillment Orchestration
//!
//! The side effects that must occur at most once per confirmed payment:
//! render an invoice, notify the customer, notify the owner. The *trigger*
//! guarantee (exactly one run per correlation key) lives in `duka-store`'s
//! check-and-set; this crate guarantees the run itself is **all-attempted**:
//!
//! - Invoice rendering failure aborts attachments, never the confirmation.
//! - Every configured channel is attempted for both recipients; no
//!   channel's failure suppresses another's attempt.
//! - Outcomes are collected into a [`FulfillmentReport`] for operators.
//!   Nothing here can change a payment's `paid` state or fail the callback
//!   acknowledgement.
//!
//! ## Seams
//!
//! [`InvoiceRenderer`] and [`NotificationChannel`] are the capability
//! traits. Shipped implementations: [`TextInvoiceRenderer`], a SendGrid v3
//! [`EmailChannel`], and a WhatsApp Graph [`ChatChannel`]. Tests plug in
//! recording fakes behind the same traits.

pub mod channel;
pub mod chat;
pub mod email;
pub mod invoice;
pub mod orchestrator;

pub use channel::{Attachment, ChannelError, Message, NotificationChannel, Party};
pub use chat::{ChatChannel, ChatConfig};
pub use email::{EmailChannel, EmailConfig};
pub use invoice::{Invoice, InvoiceRenderer, RenderError, TextInvoiceRenderer};
pub use orchestrator::{
    ChannelOutcome, DispatchResult, FulfillmentContext, FulfillmentReport, Orchestrator,
    Recipient,
};
