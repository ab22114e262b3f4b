//! Order saga input and output.

use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::{Item, OrderStatus};

/// Input that starts an order saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInput {
    pub id: OrderId,
    #[serde(rename = "customerID")]
    pub customer_id: CustomerId,
    pub items: Vec<Item>,
}

impl OrderInput {
    /// Creates a new OrderInput.
    pub fn new(id: impl Into<OrderId>, customer_id: impl Into<CustomerId>, items: Vec<Item>) -> Self {
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            items,
        }
    }

    /// Validates the input before any state is created.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.is_blank() {
            return Err(DomainError::OrderIdRequired);
        }
        if self.customer_id.is_blank() {
            return Err(DomainError::CustomerIdRequired);
        }
        if self.items.is_empty() {
            return Err(DomainError::NoItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// Value returned by a finished order saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub status: OrderStatus,
}
