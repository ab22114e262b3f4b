//! Order store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// Order summary kept by the store for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    #[serde(rename = "customerID")]
    pub customer_id: CustomerId,
    pub received_at: DateTime<Utc>,
    pub status: OrderStatus,
}

/// Trait for order status persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Records a new order.
    async fn insert_order(&self, record: OrderRecord) -> Result<(), SagaError>;

    /// Records a status change of an existing order.
    async fn update_order_status(&self, id: &OrderId, status: OrderStatus)
    -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, OrderRecord>,
    history: HashMap<OrderId, Vec<OrderStatus>>,
    fail_on_insert: bool,
    fail_on_update: bool,
}

/// In-memory order store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every insert.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_insert = fail;
    }

    /// Configures the store to fail every status update.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_update = fail;
    }

    /// Returns the latest record of an order.
    pub fn get(&self, id: &OrderId) -> Option<OrderRecord> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .orders
            .get(id)
            .cloned()
    }

    /// Returns every status recorded for an order, oldest first.
    pub fn history(&self, id: &OrderId) -> Vec<OrderStatus> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every record, newest first.
    pub fn list(&self) -> Vec<OrderRecord> {
        let mut records: Vec<OrderRecord> = self
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .orders
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        records
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, record: OrderRecord) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if state.fail_on_insert {
            return Err(SagaError::OrderStore("Insert failed".to_string()));
        }

        state
            .history
            .entry(record.id.clone())
            .or_default()
            .push(record.status);
        state.orders.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if state.fail_on_update {
            return Err(SagaError::OrderStore("Update failed".to_string()));
        }

        let Some(record) = state.orders.get_mut(id) else {
            return Err(SagaError::OrderStore(format!("Order {id} not found")));
        };
        record.status = status;
        state.history.entry(id.clone()).or_default().push(status);
        Ok(())
    }
}
