//! Capabilities the engine consumes at transition boundaries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::{BookingStatus, Money, ServiceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub reference: String,
    pub amount: Money,
    pub currency: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment declined: {reason}")]
    Declined { reason: String },

    #[error("payment processor unavailable: {reason}")]
    Unavailable { reason: String },
}

pub trait PaymentProcessor: Send + Sync {
    fn charge(&self, amount: Money, currency: &str) -> Result<Receipt, PaymentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    Booked {
        total: Money,
    },
    Cancelled {
        fee: Money,
        refund: Money,
    },
    Rescheduled {
        fee: Money,
    },
    Modified {
        fee: Money,
    },
    CheckedIn {
        seat: String,
    },
    StatusChanged {
        from: BookingStatus,
        to: BookingStatus,
    },
    Rated {
        overall: u8,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("notification failed: {reason}")]
pub struct NotifyError {
    pub reason: String,
}

pub trait Notifier: Send + Sync {
    fn send(&self, booking_id: &str, event: &BookingEvent) -> Result<(), NotifyError>;
}

/// Read-only catalog behind `action=search`.
pub trait Catalog: Send + Sync {
    fn search(
        &self,
        service: Option<ServiceType>,
        params: &BTreeMap<String, String>,
    ) -> serde_json::Value;
}

/// Accepts every charge.
#[derive(Default)]
pub struct NoopPayments {
    counter: AtomicU64,
}

impl PaymentProcessor for NoopPayments {
    fn charge(&self, amount: Money, currency: &str) -> Result<Receipt, PaymentError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(Receipt {
            reference: format!("noop-{n}"),
            amount,
            currency: currency.to_string(),
        })
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send(&self, _booking_id: &str, _event: &BookingEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub struct EmptyCatalog;

impl Catalog for EmptyCatalog {
    fn search(
        &self,
        _service: Option<ServiceType>,
        _params: &BTreeMap<String, String>,
    ) -> serde_json::Value {
        serde_json::Value::Array(Vec::new())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn noop_payments_issue_unique_references() {
        let payments = NoopPayments::default();
        let a = payments.charge(Money::from_major(10), "INR").unwrap();
        let b = payments.charge(Money::from_major(10), "INR").unwrap();
        assert_ne!(a.reference, b.reference);
        assert_eq!(a.currency, "INR");
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(BookingEvent::StatusChanged {
            from: BookingStatus::Preparing,
            to: BookingStatus::OutForDelivery,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "status_changed",
                "from": "preparing",
                "to": "out_for_delivery"
            })
        );
    }

    #[test]
    fn empty_catalog_returns_empty_list() {
        assert_eq!(
            EmptyCatalog.search(Some(ServiceType::Hotel), &BTreeMap::new()),
            serde_json::json!([])
        );
    }
}
