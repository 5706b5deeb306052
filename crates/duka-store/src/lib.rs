//! # duka-store — The Correlation Store
//!
//! Durable mapping from a push-payment correlation key to its current
//! status. This is the only shared mutable state in the pipeline, and the
//! place where the at-most-once fulfillment guarantee lives.
//!
//! ## Contract
//!
//! The [`CorrelationStore`] trait is the contract; the backing technology is
//! not. [`InMemoryStore`] ships for single-process deployments; a relational
//! or embedded-KV backend slots in behind the same trait.
//!
//! Requirements on any backend:
//!
//! - Writes to a given correlation key are linearizable per key. No
//!   multi-key transactions are needed — fulfillment only requires atomicity
//!   on the single `fulfilled` flag.
//! - [`CorrelationStore::apply_callback`] performs the check-and-set: it
//!   reports `fulfillment_due = true` exactly once per key, on the first
//!   transition into [`PaymentState::Paid`]. Duplicate or replayed callbacks
//!   observe `fulfilled = true` and are absorbed.
//! - Records are never deleted during normal operation (audit trail).
//!
//! ## Pending is the absence of a record
//!
//! No record is ever written in the `Pending` state. A status query for a
//! key with no [`PaymentStatus`] record reports pending — whether the key is
//! still awaiting its callback or was never issued at all is deliberately
//! indistinguishable to the polling client.

pub mod memory;
pub mod records;

pub use memory::InMemoryStore;
pub use records::{CallbackApplied, CallbackOutcome, PaymentRequest, PaymentState, PaymentStatus};

use async_trait::async_trait;
use duka_core::CorrelationKey;

/// Errors from correlation store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A payment request already exists under this correlation key.
    ///
    /// Correlation keys are gateway-minted and unique for the lifetime of a
    /// request, so a duplicate insert indicates a caller bug or a gateway
    /// key reuse — both worth surfacing, never silently overwriting.
    #[error("payment request already recorded for correlation key {key}")]
    DuplicateRequest { key: CorrelationKey },

    /// The backend itself failed (I/O, connection loss). The in-memory
    /// backend never raises this; database-backed implementations do.
    #[error("store backend error: {reason}")]
    Backend { reason: String },
}

/// Narrow interface over the correlation store.
///
/// `get` + `upsert-with-check-and-set`, nothing more. All methods must be
/// safe under concurrent callers; `status` is a pure point read safe to
/// call at arbitrary polling frequency.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Record a newly initiated payment request. Exactly once per key;
    /// the record is immutable afterwards.
    async fn record_request(&self, request: PaymentRequest) -> Result<(), StoreError>;

    /// Fetch the initiation record for a key, if one exists.
    async fn request(&self, key: &CorrelationKey) -> Result<Option<PaymentRequest>, StoreError>;

    /// Apply a gateway callback outcome with per-key check-and-set.
    ///
    /// Always records the outcome (keys with no prior [`PaymentRequest`]
    /// are accepted — the store is schemaless enough to hold a foreign key
    /// for audit). Returns [`CallbackApplied::fulfillment_due`] `= true`
    /// only on the first transition into [`PaymentState::Paid`], with the
    /// `fulfilled` flag set atomically in the same per-key operation.
    async fn apply_callback(
        &self,
        key: &CorrelationKey,
        outcome: CallbackOutcome,
    ) -> Result<CallbackApplied, StoreError>;

    /// Fetch the status record for a key. `None` means pending.
    async fn status(&self, key: &CorrelationKey) -> Result<Option<PaymentStatus>, StoreError>;
}
