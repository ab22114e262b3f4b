//! Messages exchanged between instances and with the outside world.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::ShipmentId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::shipment::ShipmentState;

/// Signal name: customer decision on an order with unavailable items.
pub const CUSTOMER_ACTION_SIGNAL: &str = "CustomerAction";

/// Signal name: a shipment reports a status change to its order.
pub const SHIPMENT_STATUS_UPDATED_SIGNAL: &str = "ShipmentStatusUpdated";

/// Signal name: a carrier reports a status change to a shipment.
pub const SHIPMENT_CARRIER_UPDATE_SIGNAL: &str = "ShipmentCarrierUpdate";

/// Outcome of the customer decision gate.
///
/// `Cancel` and `Amend` arrive from the customer. `TimedOut` is only ever
/// produced by the gate itself when the deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerAction {
    /// Cancel the whole order.
    Cancel,
    /// Drop the unavailable items and continue with the rest.
    Amend,
    /// No decision arrived before the deadline.
    TimedOut,
}

impl CustomerAction {
    /// Returns true if a customer may send this action.
    pub fn is_customer_choice(&self) -> bool {
        matches!(self, CustomerAction::Cancel | CustomerAction::Amend)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerAction::Cancel => "cancel",
            CustomerAction::Amend => "amend",
            CustomerAction::TimedOut => "timedOut",
        }
    }
}

impl std::fmt::Display for CustomerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancel" => Ok(CustomerAction::Cancel),
            "amend" => Ok(CustomerAction::Amend),
            "timedOut" => Ok(CustomerAction::TimedOut),
            other => Err(DomainError::UnknownCustomerAction(other.to_string())),
        }
    }
}

/// Customer decision sent to an order waiting in `customerActionRequired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerActionSignal {
    pub action: CustomerAction,
}

impl CustomerActionSignal {
    pub fn new(action: CustomerAction) -> Self {
        Self { action }
    }
}

/// Status change sent by a shipment to the order that spawned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStatusUpdated {
    #[serde(rename = "shipmentID")]
    pub shipment_id: ShipmentId,
    pub status: ShipmentState,
    pub updated_at: DateTime<Utc>,
}

/// Status change reported by a carrier for a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentCarrierUpdate {
    pub status: ShipmentState,
}

impl ShipmentCarrierUpdate {
    pub fn new(status: ShipmentState) -> Self {
        Self { status }
    }
}
