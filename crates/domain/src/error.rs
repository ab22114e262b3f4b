//! Domain error types.

use thiserror::Error;

/// Errors raised while validating domain input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Order ID is required.
    #[error("Order ID is required")]
    OrderIdRequired,

    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Order has no items.
    #[error("Order must contain items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {sku}: {quantity} (must be greater than 0)")]
    InvalidQuantity { sku: String, quantity: u32 },

    /// Customer action name is not recognised.
    #[error("Unknown customer action {0:?}")]
    UnknownCustomerAction(String),

    /// Shipment status name is not recognised.
    #[error("Unknown shipment status {0:?}")]
    UnknownShipmentStatus(String),
}
