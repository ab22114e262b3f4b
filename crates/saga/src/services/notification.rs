//! Notification service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::ShipmentState;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// Which shipment milestone a customer is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Booked,
    Dispatched,
    Delivered,
}

impl NotificationKind {
    /// Returns the notification for a shipment status, if it has one.
    pub fn for_status(status: ShipmentState) -> Option<Self> {
        match status {
            ShipmentState::Pending => None,
            ShipmentState::Booked => Some(NotificationKind::Booked),
            ShipmentState::Dispatched => Some(NotificationKind::Dispatched),
            ShipmentState::Delivered => Some(NotificationKind::Delivered),
        }
    }
}

/// A shipment milestone notification for the customer of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentNotification {
    pub kind: NotificationKind,
    pub order_id: OrderId,
}

/// Trait for customer notifications.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends a shipment milestone notification.
    async fn notify(&self, notification: ShipmentNotification) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<ShipmentNotification>,
    fail_on_notify: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every notify call.
    pub fn set_fail_on_notify(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_notify = fail;
    }

    /// Returns every notification sent, in order.
    pub fn sent(&self) -> Vec<ShipmentNotification> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .sent
            .clone()
    }

    /// Returns the kinds of notification sent for an order, in order.
    pub fn kinds_for(&self, order_id: &OrderId) -> Vec<NotificationKind> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .sent
            .iter()
            .filter(|n| &n.order_id == order_id)
            .map(|n| n.kind)
            .collect()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn notify(&self, notification: ShipmentNotification) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if state.fail_on_notify {
            return Err(SagaError::NotificationService(
                "Mail server unreachable".to_string(),
            ));
        }

        state.sent.push(notification);
        Ok(())
    }
}
