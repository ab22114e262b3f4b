//! Order state machine and related types.

mod aggregate;
mod commands;
mod events;
mod fulfillment;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderStatusView};
pub use commands::{OrderInput, OrderResult};
pub use events::{
    FulfillmentStatusChangedData, OrderEvent, PaymentRecordedData, PaymentStartedData,
    ShipmentStartedData,
};
pub use fulfillment::{Fulfillment, FulfillmentStatus, PaymentState, PaymentStatus, ShipmentStatus};
pub use state::OrderStatus;
pub use value_objects::{Item, Money, Reservation};
