//! Order domain events.

use chrono::{DateTime, Utc};
use common::{FulfillmentId, ShipmentId};
use serde::{Deserialize, Serialize};

use crate::signals::ShipmentStatusUpdated;
use crate::state_machine::DomainEvent;

use super::{FulfillmentStatus, OrderStatus, PaymentStatus, Reservation};

/// Events that change an order instance.
///
/// The saga loop is the only producer that applies these to the `Order`.
/// Fulfillment processors send them over a channel; shipment updates arrive
/// as signals and are wrapped in `ShipmentStatusUpdated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Inventory was resolved into reservations; one fulfillment per reservation.
    FulfillmentsReserved(Vec<Reservation>),

    /// The order moved to a new lifecycle status.
    StatusChanged(OrderStatus),

    /// The customer amended the order; unavailable fulfillments are dropped.
    UnavailableFulfillmentsCancelled,

    /// Every fulfillment that can still be cancelled is cancelled.
    AllFulfillmentsCancelled,

    /// A fulfillment moved to a new status.
    FulfillmentStatusChanged(FulfillmentStatusChangedData),

    /// A payment attempt started with the given idempotency key.
    PaymentStarted(PaymentStartedData),

    /// The gateway returned a cost breakdown.
    PaymentRecorded(PaymentRecordedData),

    /// The gateway call failed or the charge was declined.
    PaymentFailed(FulfillmentId),

    /// A shipment instance was spawned for a fulfillment.
    ShipmentStarted(ShipmentStartedData),

    /// A shipment reported a status change.
    ShipmentStatusUpdated(ShipmentStatusUpdated),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::FulfillmentsReserved(_) => "FulfillmentsReserved",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::UnavailableFulfillmentsCancelled => "UnavailableFulfillmentsCancelled",
            OrderEvent::AllFulfillmentsCancelled => "AllFulfillmentsCancelled",
            OrderEvent::FulfillmentStatusChanged(_) => "FulfillmentStatusChanged",
            OrderEvent::PaymentStarted(_) => "PaymentStarted",
            OrderEvent::PaymentRecorded(_) => "PaymentRecorded",
            OrderEvent::PaymentFailed(_) => "PaymentFailed",
            OrderEvent::ShipmentStarted(_) => "ShipmentStarted",
            OrderEvent::ShipmentStatusUpdated(_) => "ShipmentStatusUpdated",
        }
    }
}

/// Data for FulfillmentStatusChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentStatusChangedData {
    pub fulfillment_id: FulfillmentId,
    pub status: FulfillmentStatus,
}

/// Data for PaymentStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStartedData {
    pub fulfillment_id: FulfillmentId,

    /// Key reused by every execution of this payment attempt.
    pub idempotency_key: String,
}

/// Data for PaymentRecorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedData {
    pub fulfillment_id: FulfillmentId,
    pub payment: PaymentStatus,
}

/// Data for ShipmentStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentStartedData {
    pub fulfillment_id: FulfillmentId,
    pub shipment_id: ShipmentId,
    pub started_at: DateTime<Utc>,
}

// Convenience constructors for events
impl OrderEvent {
    /// Creates a FulfillmentStatusChanged event.
    pub fn fulfillment_status_changed(
        fulfillment_id: FulfillmentId,
        status: FulfillmentStatus,
    ) -> Self {
        OrderEvent::FulfillmentStatusChanged(FulfillmentStatusChangedData {
            fulfillment_id,
            status,
        })
    }

    /// Creates a PaymentStarted event.
    pub fn payment_started(fulfillment_id: FulfillmentId, idempotency_key: String) -> Self {
        OrderEvent::PaymentStarted(PaymentStartedData {
            fulfillment_id,
            idempotency_key,
        })
    }

    /// Creates a PaymentRecorded event.
    pub fn payment_recorded(fulfillment_id: FulfillmentId, payment: PaymentStatus) -> Self {
        OrderEvent::PaymentRecorded(PaymentRecordedData {
            fulfillment_id,
            payment,
        })
    }

    /// Creates a ShipmentStarted event for the shipment that shares the fulfillment's id.
    pub fn shipment_started(fulfillment_id: FulfillmentId) -> Self {
        OrderEvent::ShipmentStarted(ShipmentStartedData {
            shipment_id: ShipmentId::from(&fulfillment_id),
            fulfillment_id,
            started_at: Utc::now(),
        })
    }

    /// Returns the fulfillment this event targets, if any.
    pub fn fulfillment_id(&self) -> Option<&FulfillmentId> {
        match self {
            OrderEvent::FulfillmentStatusChanged(data) => Some(&data.fulfillment_id),
            OrderEvent::PaymentStarted(data) => Some(&data.fulfillment_id),
            OrderEvent::PaymentRecorded(data) => Some(&data.fulfillment_id),
            OrderEvent::PaymentFailed(id) => Some(id),
            OrderEvent::ShipmentStarted(data) => Some(&data.fulfillment_id),
            _ => None,
        }
    }
}
