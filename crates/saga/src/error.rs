//! Saga error types.

use common::InstanceRef;
use domain::{CustomerAction, DomainError};
use thiserror::Error;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Input rejected before any state was created.
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),

    /// Inventory service error.
    #[error("Inventory service error: {0}")]
    InventoryService(String),

    /// Payment service error.
    #[error("Payment service error: {0}")]
    PaymentService(String),

    /// Shipping service error.
    #[error("Shipping service error: {0}")]
    ShippingService(String),

    /// Notification service error.
    #[error("Notification service error: {0}")]
    NotificationService(String),

    /// Order store error.
    #[error("Order store error: {0}")]
    OrderStore(String),

    /// The booking collaborator did not answer in time.
    #[error("Shipment booking timed out after {0:?}")]
    BookingTimedOut(std::time::Duration),

    /// A customer action signal carried an action the customer may not send.
    #[error("Invalid customer action: {0}")]
    InvalidCustomerAction(CustomerAction),

    /// No instance is registered under this address.
    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceRef),

    /// The instance has ended and no longer receives signals.
    #[error("Instance {0} is closed")]
    InstanceClosed(InstanceRef),

    /// The addressed instance does not accept this signal.
    #[error("Instance {instance} does not accept signal {signal}")]
    SignalRejected {
        instance: InstanceRef,
        signal: &'static str,
    },

    /// An instance is already registered under this address.
    #[error("Instance {0} has already been started")]
    AlreadyStarted(InstanceRef),

    /// A mailbox the instance was waiting on was closed.
    #[error("Mailbox {0} closed")]
    MailboxClosed(&'static str),

    /// A spawned task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
