//! Fulfillments and the payment/shipment snapshots they carry.

use chrono::{DateTime, Utc};
use common::{FulfillmentId, ShipmentId};
use serde::{Deserialize, Serialize};

use super::{Item, Money};
use crate::shipment::ShipmentState;

/// The status of a single fulfillment.
///
/// State transitions:
/// ```text
/// Pending ─────► Processing ──┬──► Completed
///    │                        └──► Failed
///    └─────► Cancelled
/// Unavailable ──► Cancelled
/// ```
/// Cancellations are made by the order saga only; the fulfillment processor
/// drives the `Processing` branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FulfillmentStatus {
    #[default]
    Pending,
    Unavailable,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl FulfillmentStatus {
    /// Returns true if `next` is a forward edge from this status.
    pub fn can_transition_to(&self, next: FulfillmentStatus) -> bool {
        use FulfillmentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Cancelled)
                | (Unavailable, Cancelled)
                | (Processing, Completed | Failed)
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Completed | FulfillmentStatus::Failed | FulfillmentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Unavailable => "unavailable",
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Completed => "completed",
            FulfillmentStatus::Failed => "failed",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PaymentState {
    #[default]
    Pending,
    Success,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Success => "success",
            PaymentState::Failed => "failed",
        }
    }
}

/// Payment details of a fulfillment.
///
/// The idempotency key is generated once per payment attempt and reused
/// whenever the same attempt is executed again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub status: PaymentState,
    pub sub_total: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub idempotency_key: String,
}

impl PaymentStatus {
    /// Creates a pending payment for the given idempotency key.
    pub fn pending(idempotency_key: impl Into<String>) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            ..Self::default()
        }
    }
}

/// Snapshot of a shipment as seen by its order.
///
/// Copied from `ShipmentStatusUpdated` signals; the order never commands the
/// shipment directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStatus {
    pub id: ShipmentId,
    pub status: ShipmentState,
    pub updated_at: DateTime<Utc>,
}

/// A set of items delivered in one shipment from one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub id: FulfillmentId,
    pub items: Vec<Item>,
    pub location: Option<String>,
    pub status: FulfillmentStatus,
    pub payment: Option<PaymentStatus>,
    pub shipment: Option<ShipmentStatus>,
}

impl Fulfillment {
    /// Returns the idempotency key of the current payment attempt, if any.
    pub fn idempotency_key(&self) -> Option<&str> {
        self.payment
            .as_ref()
            .map(|p| p.idempotency_key.as_str())
            .filter(|k| !k.is_empty())
    }
}
