//! Order orchestration saga.
//!
//! An order saga reserves the ordered items, asks the customer what to do
//! when some of them are unavailable, then runs one fulfillment processor
//! per warehouse group. Each processor charges the customer and starts a
//! shipment instance that follows the courier until delivery.
//!
//! Instances talk to each other only through named signals routed by
//! [`InstanceRouter`]. Every collaborator sits behind a trait in
//! [`services`] so tests and the API can inject their own.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod fulfillment;
pub mod gate;
pub mod order;
pub mod router;
pub mod services;
pub mod shipment;

pub use config::SagaConfig;
pub use coordinator::{OrderHandle, SagaCoordinator};
pub use error::{Result, SagaError};
pub use fulfillment::FulfillmentProcessor;
pub use gate::await_customer_action;
pub use order::OrderSaga;
pub use router::{InstanceRouter, OrderMailbox, ShipmentMailbox, Signal};
pub use services::{
    BookingResult, ChargeRequest, ChargeResult, InMemoryInventoryService,
    InMemoryNotificationService, InMemoryOrderStore, InMemoryPaymentGateway, InMemoryServices,
    InMemoryShippingService, InventoryService, NotificationKind, NotificationService,
    OrderRecord, OrderStore, PaymentGateway, Services, ShipmentNotification, ShippingService,
};
pub use shipment::{ShipmentInput, ShipmentResult, ShipmentWorkflow};
