//! # Canonical Order Shape
//!
//! Checkout clients in the wild disagree on field names: some post `items`,
//! some post `cart`; some say `quantity`, some say `qty`. Those aliases are
//! absorbed here, at deserialization, so exactly one shape circulates inside
//! the system.
//!
//! The core treats an [`Order`] as an opaque value attached to a payment
//! request by correlation key — it has no lifecycle of its own. It is read
//! again only at fulfillment time, for invoice rendering and notification
//! composition.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The customer attached to an order. Every field except the name is
/// optional — a missing email simply means no email notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Raw phone as supplied by the checkout; canonicalized to an
    /// [`crate::Msisdn`] only where a channel actually needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A single order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub name: String,
    /// Unit price in whole shillings.
    #[serde(default)]
    pub price: u64,
    /// Quantity; `qty` accepted as an alias at the boundary.
    #[serde(default = "one", alias = "qty")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

impl LineItem {
    /// Line total in whole shillings.
    pub fn line_total(&self) -> u64 {
        self.price * u64::from(self.quantity)
    }
}

/// The canonical order payload supplied at checkout.
///
/// `cart` is accepted as an alias for `items`. Totals are optional on the
/// wire; [`Order::total`] falls back to `subtotal + shipping`, and
/// [`Order::subtotal`] falls back to the sum of line totals, so a sparse
/// payload still renders a coherent invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Storefront order id; generated when the checkout supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default, alias = "cart")]
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<u64>,
    #[serde(default)]
    pub shipping: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl Order {
    /// Subtotal in whole shillings: the wire value when present, otherwise
    /// the sum of line totals.
    pub fn subtotal(&self) -> u64 {
        self.subtotal
            .unwrap_or_else(|| self.items.iter().map(LineItem::line_total).sum())
    }

    /// Grand total in whole shillings: the wire value when present,
    /// otherwise `subtotal + shipping`.
    pub fn total(&self) -> u64 {
        self.total.unwrap_or_else(|| self.subtotal() + self.shipping)
    }

    /// The order id, minting a `DK-<millis>` one on first call if the
    /// checkout supplied none.
    pub fn ensure_order_id(&mut self) -> &str {
        if self.order_id.is_none() {
            self.order_id = Some(format!("DK-{}", Utc::now().timestamp_millis()));
        }
        self.order_id.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_and_qty_aliases_normalize() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "customer": { "name": "Wanjiku" },
            "cart": [
                { "name": "Beaded necklace", "price": 1200, "qty": 2 },
                { "name": "Kiondo basket", "price": 800 }
            ],
            "shipping": 300
        }))
        .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[1].quantity, 1);
        assert_eq!(order.subtotal(), 3200);
        assert_eq!(order.total(), 3500);
    }

    #[test]
    fn canonical_field_names_still_accepted() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "items": [{ "name": "Soap", "price": 150, "quantity": 3 }],
            "subtotal": 450,
            "total": 450
        }))
        .unwrap();
        assert_eq!(order.subtotal(), 450);
        assert_eq!(order.total(), 450);
    }

    #[test]
    fn wire_totals_win_over_computed() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "items": [{ "name": "Mug", "price": 500, "quantity": 1 }],
            "subtotal": 450,
            "shipping": 100,
            "total": 550
        }))
        .unwrap();
        // Discounted subtotal from the storefront is respected verbatim.
        assert_eq!(order.subtotal(), 450);
        assert_eq!(order.total(), 550);
    }

    #[test]
    fn order_id_minted_once() {
        let mut order = Order::default();
        let id = order.ensure_order_id().to_string();
        assert!(id.starts_with("DK-"));
        assert_eq!(order.ensure_order_id(), id);
    }

    #[test]
    fn empty_payload_is_a_valid_order() {
        let order: Order = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(order.total(), 0);
        assert!(order.items.is_empty());
    }
}
