//! Shipment state machine.
//!
//! One instance per fulfillment. The status moves `pending -> booked` through
//! the booking step and afterwards only through carrier updates, which are
//! accepted as-is. The instance ends when the status reaches `delivered`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{InstanceRef, OrderId, ShipmentId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::signals::ShipmentStatusUpdated;
use crate::state_machine::{DomainEvent, StateMachine};

/// Carrier lifecycle of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentState {
    #[default]
    Pending,
    Booked,
    Dispatched,
    Delivered,
}

impl ShipmentState {
    /// Returns true if this is the terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentState::Delivered)
    }

    /// Returns true if a carrier may report this status. `Pending` is only
    /// ever the initial state.
    pub fn is_carrier_status(&self) -> bool {
        !matches!(self, ShipmentState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentState::Pending => "pending",
            ShipmentState::Booked => "booked",
            ShipmentState::Dispatched => "dispatched",
            ShipmentState::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ShipmentState::Pending),
            "booked" => Ok(ShipmentState::Booked),
            "dispatched" => Ok(ShipmentState::Dispatched),
            "delivered" => Ok(ShipmentState::Delivered),
            other => Err(DomainError::UnknownShipmentStatus(other.to_string())),
        }
    }
}

/// Events that change a shipment instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShipmentEvent {
    /// The booking collaborator accepted the shipment.
    Booked {
        courier_reference: String,
        at: DateTime<Utc>,
    },

    /// A carrier reported a new status.
    CarrierUpdated {
        status: ShipmentState,
        at: DateTime<Utc>,
    },
}

impl DomainEvent for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::Booked { .. } => "Booked",
            ShipmentEvent::CarrierUpdated { .. } => "CarrierUpdated",
        }
    }
}

impl ShipmentEvent {
    pub fn booked(courier_reference: impl Into<String>) -> Self {
        ShipmentEvent::Booked {
            courier_reference: courier_reference.into(),
            at: Utc::now(),
        }
    }

    pub fn carrier_updated(status: ShipmentState) -> Self {
        ShipmentEvent::CarrierUpdated {
            status,
            at: Utc::now(),
        }
    }
}

/// State of one shipment instance.
///
/// `requestor` addresses the order to notify of every status change. It
/// grants no control over that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    id: ShipmentId,
    requestor: OrderId,
    status: ShipmentState,
    updated_at: DateTime<Utc>,
    courier_reference: Option<String>,
}

/// Read-only projection of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentView {
    pub id: ShipmentId,
    #[serde(rename = "requestorID")]
    pub requestor: OrderId,
    pub status: ShipmentState,
    pub updated_at: DateTime<Utc>,
    pub courier_reference: Option<String>,
}

impl StateMachine for Shipment {
    type Event = ShipmentEvent;

    fn instance(&self) -> InstanceRef {
        InstanceRef::Shipment(self.id.clone())
    }

    fn apply(&mut self, event: Self::Event) {
        if self.status.is_terminal() {
            return;
        }

        match event {
            ShipmentEvent::Booked {
                courier_reference,
                at,
            } => {
                if self.courier_reference.is_some() {
                    return;
                }
                self.courier_reference = Some(courier_reference);
                self.status = ShipmentState::Booked;
                self.updated_at = at;
            }
            ShipmentEvent::CarrierUpdated { status, at } => {
                self.status = status;
                self.updated_at = at;
            }
        }
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Shipment {
    /// Creates a pending shipment reporting to `requestor`.
    pub fn new(id: ShipmentId, requestor: OrderId) -> Self {
        Self {
            id,
            requestor,
            status: ShipmentState::Pending,
            updated_at: Utc::now(),
            courier_reference: None,
        }
    }

    pub fn id(&self) -> &ShipmentId {
        &self.id
    }

    pub fn requestor(&self) -> &OrderId {
        &self.requestor
    }

    pub fn status(&self) -> ShipmentState {
        self.status
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn courier_reference(&self) -> Option<&str> {
        self.courier_reference.as_deref()
    }

    /// Returns the message announcing the current status to the requestor.
    pub fn status_update(&self) -> ShipmentStatusUpdated {
        ShipmentStatusUpdated {
            shipment_id: self.id.clone(),
            status: self.status,
            updated_at: self.updated_at,
        }
    }

    pub fn view(&self) -> ShipmentView {
        ShipmentView {
            id: self.id.clone(),
            requestor: self.requestor.clone(),
            status: self.status,
            updated_at: self.updated_at,
            courier_reference: self.courier_reference.clone(),
        }
    }
}
