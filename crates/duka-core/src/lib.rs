//! # duka-core — Foundational Types for Duka Pay
//!
//! Domain-primitive newtypes and the canonical order shape shared by every
//! other crate in the workspace:
//!
//! - **Identifiers** ([`identity`]): [`CorrelationKey`] (the gateway-issued
//!   `CheckoutRequestID` that ties an initiation to its asynchronous
//!   callback), [`Msisdn`] (canonical `254XXXXXXXXX` mobile number), and
//!   [`AmountKes`] (whole-shilling amount, the unit the gateway accepts).
//!
//! - **Orders** ([`order`]): the single canonical [`Order`] shape. Checkout
//!   clients in the wild disagree on field names (`cart` vs `items`,
//!   `qty` vs `quantity`); the aliases are absorbed at deserialization so
//!   the ambiguity never propagates past the boundary.
//!
//! - **Errors** ([`error`]): [`ValidationError`], the construction-time
//!   failure type for every validated newtype.

pub mod error;
pub mod identity;
pub mod order;

pub use error::ValidationError;
pub use identity::{AmountKes, CorrelationKey, Msisdn};
pub use order::{Customer, LineItem, Order};
