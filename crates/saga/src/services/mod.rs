//! Collaborator traits and in-memory implementations used by the saga.

pub mod inventory;
pub mod notification;
pub mod order_store;
pub mod payment;
pub mod shipping;

use std::sync::Arc;

pub use inventory::{InMemoryInventoryService, InventoryService};
pub use notification::{
    InMemoryNotificationService, NotificationKind, NotificationService, ShipmentNotification,
};
pub use order_store::{InMemoryOrderStore, OrderRecord, OrderStore};
pub use payment::{ChargeRequest, ChargeResult, InMemoryPaymentGateway, PaymentGateway};
pub use shipping::{BookingResult, InMemoryShippingService, ShippingService};

/// Collaborators handed to every saga, processor and shipment instance.
#[derive(Clone)]
pub struct Services {
    pub inventory: Arc<dyn InventoryService>,
    pub payment: Arc<dyn PaymentGateway>,
    pub shipping: Arc<dyn ShippingService>,
    pub notification: Arc<dyn NotificationService>,
    pub order_store: Arc<dyn OrderStore>,
}

/// Handles to the in-memory collaborators behind a [`Services`] bundle.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServices {
    pub inventory: InMemoryInventoryService,
    pub payment: InMemoryPaymentGateway,
    pub shipping: InMemoryShippingService,
    pub notification: InMemoryNotificationService,
    pub order_store: InMemoryOrderStore,
}

impl InMemoryServices {
    /// Creates a fresh set of in-memory collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a bundle sharing state with these handles.
    pub fn services(&self) -> Services {
        Services {
            inventory: Arc::new(self.inventory.clone()),
            payment: Arc::new(self.payment.clone()),
            shipping: Arc::new(self.shipping.clone()),
            notification: Arc::new(self.notification.clone()),
            order_store: Arc::new(self.order_store.clone()),
        }
    }
}
