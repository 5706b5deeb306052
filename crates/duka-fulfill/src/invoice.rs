//! Invoice rendering capability.
//!
//! Consumed as "render(context) → document bytes". The shipped renderer
//! produces a plain-text invoice; PDF or HTML backends plug in behind the
//! same trait. A render failure aborts notification attachments only — the
//! order is still paid.

use chrono::Utc;

use crate::channel::Attachment;
use crate::orchestrator::FulfillmentContext;

/// A rendered invoice document.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Invoice {
    /// Package the invoice as a notification attachment.
    pub fn as_attachment(&self) -> Attachment {
        Attachment {
            filename: self.filename.clone(),
            mime_type: self.mime_type,
            bytes: self.bytes.clone(),
        }
    }
}

/// Errors from invoice rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invoice rendering failed: {reason}")]
    Failed { reason: String },
}

/// Capability seam for invoice rendering.
pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, ctx: &FulfillmentContext) -> Result<Invoice, RenderError>;
}

/// Plain-text invoice renderer.
#[derive(Debug, Clone)]
pub struct TextInvoiceRenderer {
    brand_name: String,
    contact_line: Option<String>,
}

impl TextInvoiceRenderer {
    pub fn new(brand_name: impl Into<String>) -> Self {
        Self {
            brand_name: brand_name.into(),
            contact_line: None,
        }
    }

    /// Footer contact line (e.g. a support email address).
    pub fn with_contact_line(mut self, line: impl Into<String>) -> Self {
        self.contact_line = Some(line.into());
        self
    }
}

impl InvoiceRenderer for TextInvoiceRenderer {
    fn render(&self, ctx: &FulfillmentContext) -> Result<Invoice, RenderError> {
        let order = &ctx.order;
        let order_id = order.order_id.as_deref().unwrap_or(ctx.correlation_key.as_str());
        let customer = &order.customer;

        let mut out = String::new();
        out.push_str(&format!("{}\n", self.brand_name));
        out.push_str(&format!("Invoice: {order_id}\n"));
        out.push_str(&format!("Date: {}\n\n", Utc::now().format("%Y-%m-%d %H:%M UTC")));

        out.push_str("Bill To:\n");
        out.push_str(&format!("  {}\n", customer.name));
        if let Some(email) = &customer.email {
            out.push_str(&format!("  Email: {email}\n"));
        }
        if let Some(phone) = &customer.phone {
            out.push_str(&format!("  Phone: {phone}\n"));
        }
        if let Some(address) = &customer.address {
            out.push_str(&format!("  Address: {address}\n"));
        }

        out.push_str("\nItems:\n");
        for item in &order.items {
            out.push_str(&format!(
                "  {} — {} x KES {} = KES {}\n",
                item.name,
                item.quantity,
                item.price,
                item.line_total()
            ));
        }

        out.push_str(&format!("\nSubtotal: KES {}\n", order.subtotal()));
        out.push_str(&format!("Shipping: KES {}\n", order.shipping));
        out.push_str(&format!("TOTAL:    KES {}\n", order.total()));

        out.push_str(&format!("\nPaid: KES {} via M-Pesa\n", ctx.amount_kes));
        if let Some(receipt) = &ctx.receipt_number {
            out.push_str(&format!("Receipt: {receipt}\n"));
        }

        out.push_str(&format!("\nThank you for shopping with {}!\n", self.brand_name));
        if let Some(contact) = &self.contact_line {
            out.push_str(&format!("{contact}\n"));
        }

        Ok(Invoice {
            filename: format!("invoice-{order_id}.txt"),
            mime_type: "text/plain",
            bytes: out.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::{CorrelationKey, Customer, LineItem, Order};

    fn sample_context() -> FulfillmentContext {
        FulfillmentContext {
            correlation_key: CorrelationKey::new("ws_CO_1").unwrap(),
            order: Order {
                order_id: Some("DK-1756200000000".into()),
                customer: Customer {
                    name: "Wanjiku Kamau".into(),
                    email: Some("wanjiku@example.com".into()),
                    phone: Some("0711000111".into()),
                    address: Some("Moi Avenue, Nairobi".into()),
                },
                items: vec![
                    LineItem {
                        name: "Beaded necklace".into(),
                        price: 1200,
                        quantity: 2,
                    },
                    LineItem {
                        name: "Kiondo basket".into(),
                        price: 800,
                        quantity: 1,
                    },
                ],
                shipping: 300,
                ..Default::default()
            },
            amount_kes: 3500,
            receipt_number: Some("NLJ7RT61SV".into()),
            payer_phone: Some("254711000111".into()),
        }
    }

    #[test]
    fn renders_itemized_invoice() {
        let renderer = TextInvoiceRenderer::new("Duka Pay")
            .with_contact_line("Questions? info@duka.example");
        let invoice = renderer.render(&sample_context()).unwrap();

        assert_eq!(invoice.filename, "invoice-DK-1756200000000.txt");
        assert_eq!(invoice.mime_type, "text/plain");

        let text = String::from_utf8(invoice.bytes).unwrap();
        assert!(text.contains("Invoice: DK-1756200000000"));
        assert!(text.contains("Wanjiku Kamau"));
        assert!(text.contains("Beaded necklace — 2 x KES 1200 = KES 2400"));
        assert!(text.contains("Subtotal: KES 3200"));
        assert!(text.contains("TOTAL:    KES 3500"));
        assert!(text.contains("Receipt: NLJ7RT61SV"));
        assert!(text.contains("info@duka.example"));
    }

    #[test]
    fn falls_back_to_correlation_key_without_order_id() {
        let mut ctx = sample_context();
        ctx.order.order_id = None;
        let invoice = TextInvoiceRenderer::new("Duka Pay").render(&ctx).unwrap();
        assert_eq!(invoice.filename, "invoice-ws_CO_1.txt");
    }
}
