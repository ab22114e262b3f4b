//! Order lifecycle states.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──────────────────────────────► Processing ──┬──► Completed
///           └──► CustomerActionRequired ──┬──►             └──► Failed
///                                         ├──► Cancelled
///                                         └──► TimedOut
/// ```
/// Any non-terminal status may also move to `Failed` when the saga hits a
/// fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// Order received, inventory not yet resolved.
    #[default]
    Pending,

    /// Some items are unavailable; waiting for the customer to decide.
    CustomerActionRequired,

    /// Fulfillments are being charged and shipped.
    Processing,

    /// Every fulfillment reached a leaf state and at least one did not fail (terminal).
    Completed,

    /// Every started fulfillment failed, or the saga hit a fatal error (terminal).
    Failed,

    /// The customer cancelled the order (terminal).
    Cancelled,

    /// The customer did not decide before the deadline (terminal).
    TimedOut,
}

impl OrderStatus {
    /// Returns true if the order may move from this status to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, CustomerActionRequired | Processing | Failed) => true,
            (CustomerActionRequired, Processing | Cancelled | TimedOut | Failed) => true,
            (Processing, Completed | Failed) => true,
            _ => false,
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Failed
                | OrderStatus::Cancelled
                | OrderStatus::TimedOut
        )
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::CustomerActionRequired => "customerActionRequired",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::TimedOut => "timedOut",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
