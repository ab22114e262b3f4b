//! Order instance state and its transition function.

use chrono::{DateTime, Utc};
use common::{CustomerId, FulfillmentId, InstanceRef, OrderId};
use serde::{Deserialize, Serialize};

use crate::shipment::ShipmentState;
use crate::signals::ShipmentStatusUpdated;
use crate::state_machine::StateMachine;

use super::{
    Fulfillment, FulfillmentStatus, OrderEvent, OrderStatus, PaymentState, PaymentStatus,
    Reservation, ShipmentStatus,
    events::{
        FulfillmentStatusChangedData, PaymentRecordedData, PaymentStartedData,
        ShipmentStartedData,
    },
};

/// State of one order instance.
///
/// Mutated only through [`StateMachine::apply`]. Once the status is terminal
/// every further event is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    received_at: DateTime<Utc>,
    status: OrderStatus,
    fulfillments: Vec<Fulfillment>,
}

/// Read-only projection answered by the order status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusView {
    pub id: OrderId,
    #[serde(rename = "customerID")]
    pub customer_id: CustomerId,
    pub received_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub fulfillments: Vec<Fulfillment>,
}

impl OrderStatusView {
    /// Returns the fulfillment with the given id.
    pub fn fulfillment(&self, id: &FulfillmentId) -> Option<&Fulfillment> {
        self.fulfillments.iter().find(|f| &f.id == id)
    }
}

impl StateMachine for Order {
    type Event = OrderEvent;

    fn instance(&self) -> InstanceRef {
        InstanceRef::Order(self.id.clone())
    }

    fn apply(&mut self, event: Self::Event) {
        if self.status.is_terminal() {
            tracing::debug!(
                order_id = %self.id,
                status = %self.status,
                "ignoring event on terminal order"
            );
            return;
        }

        match event {
            OrderEvent::FulfillmentsReserved(reservations) => {
                self.apply_fulfillments_reserved(reservations)
            }
            OrderEvent::StatusChanged(status) => self.apply_status_changed(status),
            OrderEvent::UnavailableFulfillmentsCancelled => {
                self.cancel_where(|f| f.status == FulfillmentStatus::Unavailable)
            }
            OrderEvent::AllFulfillmentsCancelled => self.cancel_where(|_| true),
            OrderEvent::FulfillmentStatusChanged(data) => {
                self.apply_fulfillment_status_changed(data)
            }
            OrderEvent::PaymentStarted(data) => self.apply_payment_started(data),
            OrderEvent::PaymentRecorded(data) => self.apply_payment_recorded(data),
            OrderEvent::PaymentFailed(id) => self.apply_payment_failed(&id),
            OrderEvent::ShipmentStarted(data) => self.apply_shipment_started(data),
            OrderEvent::ShipmentStatusUpdated(update) => self.apply_shipment_status_updated(update),
        }
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Query methods
impl Order {
    /// Creates a new pending order with no fulfillments.
    pub fn new(id: OrderId, customer_id: CustomerId, received_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id,
            received_at,
            status: OrderStatus::Pending,
            fulfillments: Vec::new(),
        }
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn fulfillments(&self) -> &[Fulfillment] {
        &self.fulfillments
    }

    /// Returns the fulfillment with the given id.
    pub fn fulfillment(&self, id: &FulfillmentId) -> Option<&Fulfillment> {
        self.fulfillments.iter().find(|f| &f.id == id)
    }

    /// Returns true if any fulfillment could not be reserved.
    pub fn has_unavailable(&self) -> bool {
        self.fulfillments
            .iter()
            .any(|f| f.status == FulfillmentStatus::Unavailable)
    }

    /// Returns the fulfillments a processor should be started for.
    pub fn startable_fulfillments(&self) -> impl Iterator<Item = &Fulfillment> {
        self.fulfillments
            .iter()
            .filter(|f| f.status != FulfillmentStatus::Cancelled)
    }

    /// Returns the terminal status once every started fulfillment has settled.
    ///
    /// `Failed` only if at least one fulfillment was started and all of them
    /// failed; `Completed` otherwise.
    pub fn settled_status(&self) -> OrderStatus {
        let mut started = 0;
        let mut failed = 0;
        for fulfillment in self.startable_fulfillments() {
            started += 1;
            if fulfillment.status == FulfillmentStatus::Failed {
                failed += 1;
            }
        }

        if started > 0 && failed == started {
            OrderStatus::Failed
        } else {
            OrderStatus::Completed
        }
    }

    /// Returns the status projection.
    pub fn view(&self) -> OrderStatusView {
        OrderStatusView {
            id: self.id.clone(),
            customer_id: self.customer_id.clone(),
            received_at: self.received_at,
            status: self.status,
            fulfillments: self.fulfillments.clone(),
        }
    }
}

// Event application
impl Order {
    fn apply_fulfillments_reserved(&mut self, reservations: Vec<Reservation>) {
        if !self.fulfillments.is_empty() {
            return;
        }

        self.fulfillments = reservations
            .into_iter()
            .enumerate()
            .map(|(i, reservation)| Fulfillment {
                id: FulfillmentId::new(&self.id, i + 1),
                items: reservation.items,
                location: reservation.location,
                status: if reservation.available {
                    FulfillmentStatus::Pending
                } else {
                    FulfillmentStatus::Unavailable
                },
                payment: None,
                shipment: None,
            })
            .collect();
    }

    fn apply_status_changed(&mut self, status: OrderStatus) {
        if self.status.can_transition_to(status) {
            self.status = status;
        } else {
            tracing::debug!(
                order_id = %self.id,
                from = %self.status,
                to = %status,
                "ignoring invalid order status transition"
            );
        }
    }

    fn cancel_where(&mut self, predicate: impl Fn(&Fulfillment) -> bool) {
        for fulfillment in self.fulfillments.iter_mut().filter(|f| predicate(f)) {
            if fulfillment
                .status
                .can_transition_to(FulfillmentStatus::Cancelled)
            {
                fulfillment.status = FulfillmentStatus::Cancelled;
            }
        }
    }

    fn fulfillment_mut(&mut self, id: &FulfillmentId) -> Option<&mut Fulfillment> {
        self.fulfillments.iter_mut().find(|f| &f.id == id)
    }

    fn apply_fulfillment_status_changed(&mut self, data: FulfillmentStatusChangedData) {
        if let Some(fulfillment) = self.fulfillment_mut(&data.fulfillment_id) {
            if fulfillment.status.can_transition_to(data.status) {
                fulfillment.status = data.status;
            }
        }
    }

    fn apply_payment_started(&mut self, data: PaymentStartedData) {
        if let Some(fulfillment) = self.fulfillment_mut(&data.fulfillment_id) {
            if fulfillment.payment.is_none() {
                fulfillment.payment = Some(PaymentStatus::pending(data.idempotency_key));
            }
        }
    }

    fn apply_payment_recorded(&mut self, data: PaymentRecordedData) {
        if let Some(fulfillment) = self.fulfillment_mut(&data.fulfillment_id) {
            fulfillment.payment = Some(data.payment);
        }
    }

    fn apply_payment_failed(&mut self, id: &FulfillmentId) {
        if let Some(fulfillment) = self.fulfillment_mut(id) {
            fulfillment.payment.get_or_insert_with(PaymentStatus::default).status =
                PaymentState::Failed;
        }
    }

    fn apply_shipment_started(&mut self, data: ShipmentStartedData) {
        if let Some(fulfillment) = self.fulfillment_mut(&data.fulfillment_id) {
            if fulfillment.shipment.is_some() {
                return;
            }
            fulfillment.shipment = Some(ShipmentStatus {
                id: data.shipment_id,
                status: ShipmentState::Pending,
                updated_at: data.started_at,
            });
        }
    }

    fn apply_shipment_status_updated(&mut self, update: ShipmentStatusUpdated) {
        let Some(fulfillment) = self
            .fulfillments
            .iter_mut()
            .find(|f| update.shipment_id.matches(&f.id))
        else {
            tracing::debug!(
                order_id = %self.id,
                shipment_id = %update.shipment_id,
                "ignoring update for unknown shipment"
            );
            return;
        };

        match fulfillment.shipment.as_mut() {
            Some(shipment) => {
                shipment.status = update.status;
                shipment.updated_at = update.updated_at;
            }
            None => {
                fulfillment.shipment = Some(ShipmentStatus {
                    id: update.shipment_id,
                    status: update.status,
                    updated_at: update.updated_at,
                });
            }
        }
    }
}
