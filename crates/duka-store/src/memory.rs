//! In-memory correlation store backend.
//!
//! Two `DashMap`s behind an `Arc`: one for immutable initiation records,
//! one for mutable status records. The DashMap entry API serializes all
//! writes to a single key, which is exactly the per-key linearizability the
//! check-and-set needs — no global lock, and no lock is ever held across an
//! `.await`.
//!
//! Data is lost on restart. Deployments that need the audit trail to
//! survive a restart implement [`CorrelationStore`] over a database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use duka_core::CorrelationKey;

use crate::records::{CallbackApplied, CallbackOutcome, PaymentRequest, PaymentState, PaymentStatus};
use crate::{CorrelationStore, StoreError};

struct Inner {
    requests: DashMap<CorrelationKey, PaymentRequest>,
    statuses: DashMap<CorrelationKey, PaymentStatus>,
}

/// Shared in-memory store. Cheaply cloneable via `Arc` — all clones share
/// the same data.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                requests: DashMap::new(),
                statuses: DashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorrelationStore for InMemoryStore {
    async fn record_request(&self, request: PaymentRequest) -> Result<(), StoreError> {
        match self.inner.requests.entry(request.correlation_key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::DuplicateRequest {
                key: request.correlation_key,
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(())
            }
        }
    }

    async fn request(&self, key: &CorrelationKey) -> Result<Option<PaymentRequest>, StoreError> {
        Ok(self.inner.requests.get(key).map(|r| r.clone()))
    }

    async fn apply_callback(
        &self,
        key: &CorrelationKey,
        outcome: CallbackOutcome,
    ) -> Result<CallbackApplied, StoreError> {
        let now = Utc::now();

        // The entry guard serializes concurrent writers on this key, so the
        // fulfilled check-and-set below is atomic per key.
        let (state, fulfillment_due) = match self.inner.statuses.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                let status = slot.get_mut();
                if status.state == PaymentState::Paid {
                    // Terminal paid never regresses. A redelivered success or
                    // a late conflicting callback refreshes the audit
                    // timestamp only; `fulfilled` stays set.
                    status.updated_at = now;
                    (PaymentState::Paid, false)
                } else {
                    let fulfill_now = outcome.state() == PaymentState::Paid && !status.fulfilled;
                    *status = PaymentStatus::from_outcome(
                        key,
                        &outcome,
                        status.fulfilled || fulfill_now,
                        now,
                    );
                    (status.state, fulfill_now)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let fulfill_now = outcome.state() == PaymentState::Paid;
                let status = PaymentStatus::from_outcome(key, &outcome, fulfill_now, now);
                let state = status.state;
                slot.insert(status);
                (state, fulfill_now)
            }
        };

        tracing::debug!(
            correlation_key = %key,
            %state,
            fulfillment_due,
            "callback applied to correlation store"
        );

        Ok(CallbackApplied {
            state,
            fulfillment_due,
        })
    }

    async fn status(&self, key: &CorrelationKey) -> Result<Option<PaymentStatus>, StoreError> {
        Ok(self.inner.statuses.get(key).map(|s| s.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::{AmountKes, Msisdn};

    fn key(s: &str) -> CorrelationKey {
        CorrelationKey::new(s).unwrap()
    }

    fn paid_outcome() -> CallbackOutcome {
        CallbackOutcome {
            result_code: 0,
            result_desc: "The service request is processed successfully.".into(),
            amount: Some(500),
            receipt_number: Some("R1".into()),
            payer_phone: Some("254711000111".into()),
            transaction_timestamp: Some("20260826120000".into()),
        }
    }

    fn failed_outcome() -> CallbackOutcome {
        CallbackOutcome {
            result_code: 1032,
            result_desc: "Request cancelled by user".into(),
            amount: None,
            receipt_number: None,
            payer_phone: None,
            transaction_timestamp: None,
        }
    }

    fn sample_request(k: &CorrelationKey) -> PaymentRequest {
        PaymentRequest {
            correlation_key: k.clone(),
            merchant_request_id: "29115-34620561-1".into(),
            phone: Msisdn::new("0711000111").unwrap(),
            amount: AmountKes::new(500).unwrap(),
            account_reference: "DukaPay".into(),
            order: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unknown_key_has_no_status() {
        let store = InMemoryStore::new();
        assert!(store.status(&key("never-seen")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_request_rejected() {
        let store = InMemoryStore::new();
        let k = key("X1");
        store.record_request(sample_request(&k)).await.unwrap();
        let err = store.record_request(sample_request(&k)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRequest { .. }));
        assert!(store.request(&k).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn first_paid_callback_is_due_exactly_once() {
        let store = InMemoryStore::new();
        let k = key("X1");

        let first = store.apply_callback(&k, paid_outcome()).await.unwrap();
        assert_eq!(first.state, PaymentState::Paid);
        assert!(first.fulfillment_due);

        // Identical redelivery: recorded, never due again.
        let second = store.apply_callback(&k, paid_outcome()).await.unwrap();
        assert_eq!(second.state, PaymentState::Paid);
        assert!(!second.fulfillment_due);

        let status = store.status(&k).await.unwrap().unwrap();
        assert!(status.fulfilled);
        assert_eq!(status.receipt_number.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn failed_callback_never_due() {
        let store = InMemoryStore::new();
        let k = key("X2");
        let applied = store.apply_callback(&k, failed_outcome()).await.unwrap();
        assert_eq!(applied.state, PaymentState::Failed);
        assert!(!applied.fulfillment_due);

        let status = store.status(&k).await.unwrap().unwrap();
        assert!(!status.fulfilled);
        assert_eq!(status.result_code, 1032);
        assert_eq!(status.result_desc, "Request cancelled by user");
    }

    #[tokio::test]
    async fn failed_then_paid_transitions_and_fires_once() {
        // The gateway may deliver a transient failure code before a retried
        // push succeeds under the same key.
        let store = InMemoryStore::new();
        let k = key("X3");

        store.apply_callback(&k, failed_outcome()).await.unwrap();
        let applied = store.apply_callback(&k, paid_outcome()).await.unwrap();
        assert_eq!(applied.state, PaymentState::Paid);
        assert!(applied.fulfillment_due);

        let again = store.apply_callback(&k, paid_outcome()).await.unwrap();
        assert!(!again.fulfillment_due);
    }

    #[tokio::test]
    async fn paid_never_regresses_to_failed() {
        let store = InMemoryStore::new();
        let k = key("X4");

        store.apply_callback(&k, paid_outcome()).await.unwrap();
        let applied = store.apply_callback(&k, failed_outcome()).await.unwrap();

        assert_eq!(applied.state, PaymentState::Paid);
        assert!(!applied.fulfillment_due);

        let status = store.status(&k).await.unwrap().unwrap();
        assert_eq!(status.state, PaymentState::Paid);
        assert_eq!(status.result_code, 0, "paid outcome fields are retained");
        assert!(status.fulfilled);
    }

    #[tokio::test]
    async fn foreign_key_callback_recorded_without_request() {
        // No PaymentRequest exists for this key; the callback is still
        // recorded and queryable.
        let store = InMemoryStore::new();
        let k = key("foreign-key");

        assert!(store.request(&k).await.unwrap().is_none());
        let applied = store.apply_callback(&k, paid_outcome()).await.unwrap();
        assert!(applied.fulfillment_due);
        assert!(store.status(&k).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_duplicate_callbacks_yield_one_due() {
        let store = InMemoryStore::new();
        let k = key("X5");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                store.apply_callback(&k, paid_outcome()).await.unwrap()
            }));
        }

        let mut due_count = 0;
        for h in handles {
            if h.await.unwrap().fulfillment_due {
                due_count += 1;
            }
        }
        assert_eq!(due_count, 1, "exactly one writer wins the check-and-set");
    }
}
