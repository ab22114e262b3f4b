//! Domain layer for the order management system.
//!
//! This crate holds the data model and the pure state-transition functions
//! for the two kinds of instances the saga runs:
//! - `Order`: the order lifecycle and its fulfillments
//! - `Shipment`: the carrier lifecycle of one fulfillment
//!
//! Nothing here performs I/O. The saga crate drives these types by feeding
//! them events; tests can do the same against a bare struct.

pub mod error;
pub mod order;
pub mod shipment;
pub mod signals;
pub mod state_machine;

pub use error::DomainError;
pub use order::{
    Fulfillment, FulfillmentStatus, Item, Money, Order, OrderEvent, OrderInput, OrderResult,
    OrderStatus, OrderStatusView, PaymentState, PaymentStatus, Reservation, ShipmentStatus,
};
pub use shipment::{Shipment, ShipmentEvent, ShipmentState, ShipmentView};
pub use signals::{
    CustomerAction, CustomerActionSignal, ShipmentCarrierUpdate, ShipmentStatusUpdated,
};
pub use state_machine::{DomainEvent, StateMachine};
