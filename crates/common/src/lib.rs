//! Identifier types shared across the order management crates.

pub mod types;

pub use types::{CustomerId, FulfillmentId, InstanceRef, OrderId, ShipmentId};
