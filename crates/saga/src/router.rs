//! Addressed mailboxes and status projections for running instances.
//!
//! Every order and shipment instance registers here under its
//! [`InstanceRef`]. Senders of named signals look the instance up and push
//! into a bounded mailbox; queries read the latest projection the instance
//! published, without waiting on it.
//!
//! An instance that ends is retired: its mailboxes close and only the final
//! projection stays. The oldest retired entries are evicted once more than
//! the retention limit have accumulated.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use common::{InstanceRef, OrderId, ShipmentId};
use domain::signals::{
    CUSTOMER_ACTION_SIGNAL, SHIPMENT_CARRIER_UPDATE_SIGNAL, SHIPMENT_STATUS_UPDATED_SIGNAL,
};
use domain::{
    CustomerActionSignal, OrderStatusView, ShipmentCarrierUpdate, ShipmentStatusUpdated,
    ShipmentView,
};
use tokio::sync::{mpsc, watch};

use crate::error::{Result, SagaError};

/// A named signal addressed to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    CustomerAction(CustomerActionSignal),
    ShipmentStatusUpdated(ShipmentStatusUpdated),
    ShipmentCarrierUpdate(ShipmentCarrierUpdate),
}

impl Signal {
    /// Returns the signal name.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::CustomerAction(_) => CUSTOMER_ACTION_SIGNAL,
            Signal::ShipmentStatusUpdated(_) => SHIPMENT_STATUS_UPDATED_SIGNAL,
            Signal::ShipmentCarrierUpdate(_) => SHIPMENT_CARRIER_UPDATE_SIGNAL,
        }
    }
}

/// Receiving side of an order instance.
pub struct OrderMailbox {
    pub customer_actions: mpsc::Receiver<CustomerActionSignal>,
    pub shipment_updates: mpsc::Receiver<ShipmentStatusUpdated>,
    pub view: watch::Sender<OrderStatusView>,
}

/// Receiving side of a shipment instance.
pub struct ShipmentMailbox {
    pub carrier_updates: mpsc::Receiver<ShipmentCarrierUpdate>,
    pub view: watch::Sender<ShipmentView>,
}

/// Senders are `None` once the instance has been retired.
enum Entry {
    Order {
        customer_actions: Option<mpsc::Sender<CustomerActionSignal>>,
        shipment_updates: Option<mpsc::Sender<ShipmentStatusUpdated>>,
        view: watch::Receiver<OrderStatusView>,
    },
    Shipment {
        carrier_updates: Option<mpsc::Sender<ShipmentCarrierUpdate>>,
        view: watch::Receiver<ShipmentView>,
    },
}

impl Entry {
    /// Drops the senders. Returns false if they were already gone.
    fn close(&mut self) -> bool {
        match self {
            Entry::Order {
                customer_actions,
                shipment_updates,
                ..
            } => {
                let open = customer_actions.is_some();
                customer_actions.take();
                shipment_updates.take();
                open
            }
            Entry::Shipment {
                carrier_updates, ..
            } => carrier_updates.take().is_some(),
        }
    }
}

#[derive(Default)]
struct Registry {
    entries: HashMap<InstanceRef, Entry>,
    /// Retired instances, oldest first.
    retired: VecDeque<InstanceRef>,
}

/// Registry of instances keyed by address.
///
/// Entries outlive their instance so that final snapshots stay queryable.
/// Signals to an instance that has ended fail with `InstanceClosed`.
#[derive(Clone)]
pub struct InstanceRouter {
    registry: Arc<RwLock<Registry>>,
    capacity: usize,
    retention: usize,
}

impl InstanceRouter {
    /// Creates an empty router whose mailboxes buffer `capacity` signals each.
    /// Retired instances are kept until [`with_retention`](Self::with_retention)
    /// sets a limit.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            capacity: capacity.max(1),
            retention: usize::MAX,
        }
    }

    /// Keeps at most `max` retired instances queryable.
    pub fn with_retention(mut self, max: usize) -> Self {
        self.retention = max;
        self
    }

    /// Registers an order instance and returns its receiving side.
    pub fn register_order(&self, initial: OrderStatusView) -> Result<OrderMailbox> {
        let instance = InstanceRef::Order(initial.id.clone());
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if registry.entries.contains_key(&instance) {
            return Err(SagaError::AlreadyStarted(instance));
        }

        let (action_tx, action_rx) = mpsc::channel(self.capacity);
        let (update_tx, update_rx) = mpsc::channel(self.capacity);
        let (view_tx, view_rx) = watch::channel(initial);
        registry.entries.insert(
            instance,
            Entry::Order {
                customer_actions: Some(action_tx),
                shipment_updates: Some(update_tx),
                view: view_rx,
            },
        );

        Ok(OrderMailbox {
            customer_actions: action_rx,
            shipment_updates: update_rx,
            view: view_tx,
        })
    }

    /// Registers a shipment instance and returns its receiving side.
    pub fn register_shipment(&self, initial: ShipmentView) -> Result<ShipmentMailbox> {
        let instance = InstanceRef::Shipment(initial.id.clone());
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if registry.entries.contains_key(&instance) {
            return Err(SagaError::AlreadyStarted(instance));
        }

        let (update_tx, update_rx) = mpsc::channel(self.capacity);
        let (view_tx, view_rx) = watch::channel(initial);
        registry.entries.insert(
            instance,
            Entry::Shipment {
                carrier_updates: Some(update_tx),
                view: view_rx,
            },
        );

        Ok(ShipmentMailbox {
            carrier_updates: update_rx,
            view: view_tx,
        })
    }

    /// Returns true if an instance is registered under this address.
    pub fn contains(&self, instance: &InstanceRef) -> bool {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .contains_key(instance)
    }

    /// Closes the mailboxes of an instance that has ended. Its last
    /// projection stays queryable until the retention limit evicts it.
    pub fn retire(&self, instance: &InstanceRef) {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = registry.entries.get_mut(instance) else {
            return;
        };
        if !entry.close() {
            return;
        }
        registry.retired.push_back(instance.clone());

        while registry.retired.len() > self.retention {
            if let Some(oldest) = registry.retired.pop_front() {
                registry.entries.remove(&oldest);
                tracing::debug!(instance = %oldest, "retired instance evicted");
            }
        }
    }

    /// Delivers a signal to the addressed instance.
    ///
    /// Waits for mailbox space if the instance is behind.
    pub async fn signal(&self, target: &InstanceRef, signal: Signal) -> Result<()> {
        let name = signal.name();
        let closed = || SagaError::InstanceClosed(target.clone());
        let rejected = || SagaError::SignalRejected {
            instance: target.clone(),
            signal: name,
        };

        // Clone the sender so the registry lock is not held while waiting.
        let delivery = {
            let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
            let entry = registry
                .entries
                .get(target)
                .ok_or_else(|| SagaError::InstanceNotFound(target.clone()))?;
            match (entry, signal) {
                (Entry::Order { customer_actions, .. }, Signal::CustomerAction(s)) => {
                    let tx = customer_actions.clone().ok_or_else(closed)?;
                    Delivery::CustomerAction(tx, s)
                }
                (Entry::Order { shipment_updates, .. }, Signal::ShipmentStatusUpdated(s)) => {
                    let tx = shipment_updates.clone().ok_or_else(closed)?;
                    Delivery::ShipmentStatusUpdated(tx, s)
                }
                (Entry::Shipment { carrier_updates, .. }, Signal::ShipmentCarrierUpdate(s)) => {
                    let tx = carrier_updates.clone().ok_or_else(closed)?;
                    Delivery::ShipmentCarrierUpdate(tx, s)
                }
                _ => return Err(rejected()),
            }
        };

        match delivery {
            Delivery::CustomerAction(tx, s) => tx.send(s).await.map_err(|_| closed()),
            Delivery::ShipmentStatusUpdated(tx, s) => tx.send(s).await.map_err(|_| closed()),
            Delivery::ShipmentCarrierUpdate(tx, s) => tx.send(s).await.map_err(|_| closed()),
        }?;

        tracing::debug!(instance = %target, signal = name, "signal delivered");
        Ok(())
    }

    /// Returns the latest status projection of an order.
    pub fn query_order(&self, id: &OrderId) -> Result<OrderStatusView> {
        let instance = InstanceRef::Order(id.clone());
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        match registry.entries.get(&instance) {
            Some(Entry::Order { view, .. }) => Ok(view.borrow().clone()),
            _ => Err(SagaError::InstanceNotFound(instance)),
        }
    }

    /// Returns the latest projection of a shipment.
    pub fn query_shipment(&self, id: &ShipmentId) -> Result<ShipmentView> {
        let instance = InstanceRef::Shipment(id.clone());
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        match registry.entries.get(&instance) {
            Some(Entry::Shipment { view, .. }) => Ok(view.borrow().clone()),
            _ => Err(SagaError::InstanceNotFound(instance)),
        }
    }

    /// Returns a receiver that observes every projection an order publishes.
    pub fn subscribe_order(&self, id: &OrderId) -> Result<watch::Receiver<OrderStatusView>> {
        let instance = InstanceRef::Order(id.clone());
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        match registry.entries.get(&instance) {
            Some(Entry::Order { view, .. }) => Ok(view.clone()),
            _ => Err(SagaError::InstanceNotFound(instance)),
        }
    }

    /// Returns every registered order id.
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .keys()
            .filter_map(|instance| match instance {
                InstanceRef::Order(id) => Some(id.clone()),
                InstanceRef::Shipment(_) => None,
            })
            .collect()
    }
}

impl Default for InstanceRouter {
    fn default() -> Self {
        Self::new(64)
    }
}

enum Delivery {
    CustomerAction(mpsc::Sender<CustomerActionSignal>, CustomerActionSignal),
    ShipmentStatusUpdated(mpsc::Sender<ShipmentStatusUpdated>, ShipmentStatusUpdated),
    ShipmentCarrierUpdate(mpsc::Sender<ShipmentCarrierUpdate>, ShipmentCarrierUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::CustomerId;
    use domain::{CustomerAction, Order, Shipment, ShipmentState};

    fn order_view(id: &str) -> OrderStatusView {
        Order::new(OrderId::new(id), CustomerId::new("c1"), Utc::now()).view()
    }

    fn shipment_view(id: &str) -> ShipmentView {
        Shipment::new(ShipmentId::new(id), OrderId::new("1234")).view()
    }

    fn cancel() -> Signal {
        Signal::CustomerAction(CustomerActionSignal::new(CustomerAction::Cancel))
    }

    #[tokio::test]
    async fn test_signal_reaches_mailbox() {
        let router = InstanceRouter::new(4);
        let mut mailbox = router.register_order(order_view("1234")).unwrap();

        router
            .signal(&InstanceRef::Order(OrderId::new("1234")), cancel())
            .await
            .unwrap();

        let received = mailbox.customer_actions.recv().await.unwrap();
        assert_eq!(received.action, CustomerAction::Cancel);
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let router = InstanceRouter::new(4);
        let result = router
            .signal(&InstanceRef::Order(OrderId::new("missing")), cancel())
            .await;
        assert!(matches!(result, Err(SagaError::InstanceNotFound(_))));
        assert!(router.query_order(&OrderId::new("missing")).is_err());
    }

    #[tokio::test]
    async fn test_signal_rejected_by_kind() {
        let router = InstanceRouter::new(4);
        let _mailbox = router.register_shipment(shipment_view("1234:1")).unwrap();

        let result = router
            .signal(&InstanceRef::Shipment(ShipmentId::new("1234:1")), cancel())
            .await;
        assert!(matches!(
            result,
            Err(SagaError::SignalRejected {
                signal: "CustomerAction",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_closed_instance_keeps_snapshot() {
        let router = InstanceRouter::new(4);
        let mailbox = router.register_shipment(shipment_view("1234:1")).unwrap();
        let target = InstanceRef::Shipment(ShipmentId::new("1234:1"));

        let mut final_view = shipment_view("1234:1");
        final_view.status = ShipmentState::Delivered;
        mailbox.view.send_replace(final_view);
        drop(mailbox);

        let result = router
            .signal(
                &target,
                Signal::ShipmentCarrierUpdate(ShipmentCarrierUpdate::new(ShipmentState::Delivered)),
            )
            .await;
        assert!(matches!(result, Err(SagaError::InstanceClosed(_))));
        assert_eq!(
            router
                .query_shipment(&ShipmentId::new("1234:1"))
                .unwrap()
                .status,
            ShipmentState::Delivered
        );
    }

    #[tokio::test]
    async fn test_retire_closes_mailboxes() {
        let router = InstanceRouter::new(4);
        let _mailbox = router.register_order(order_view("1234")).unwrap();
        let target = InstanceRef::Order(OrderId::new("1234"));

        router.retire(&target);
        router.retire(&target);

        let result = router.signal(&target, cancel()).await;
        assert!(matches!(result, Err(SagaError::InstanceClosed(_))));
        assert!(router.query_order(&OrderId::new("1234")).is_ok());
        assert!(router.contains(&target));
    }

    #[tokio::test]
    async fn test_retention_evicts_oldest_retired() {
        let router = InstanceRouter::new(4).with_retention(2);
        let _running = router.register_order(order_view("running")).unwrap();
        for id in ["1", "2", "3"] {
            let _mailbox = router.register_order(order_view(id)).unwrap();
            router.retire(&InstanceRef::Order(OrderId::new(id)));
        }

        assert!(matches!(
            router.query_order(&OrderId::new("1")),
            Err(SagaError::InstanceNotFound(_))
        ));
        assert!(router.query_order(&OrderId::new("2")).is_ok());
        assert!(router.query_order(&OrderId::new("3")).is_ok());
        assert!(router.query_order(&OrderId::new("running")).is_ok());

        let mut ids = router.order_ids();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(
            ids,
            vec![OrderId::new("2"), OrderId::new("3"), OrderId::new("running")]
        );
    }

    #[tokio::test]
    async fn test_register_twice() {
        let router = InstanceRouter::new(4);
        let _mailbox = router.register_order(order_view("1234")).unwrap();
        assert!(matches!(
            router.register_order(order_view("1234")),
            Err(SagaError::AlreadyStarted(_))
        ));
        assert_eq!(router.order_ids(), vec![OrderId::new("1234")]);
    }

    #[tokio::test]
    async fn test_query_sees_latest_publish() {
        let router = InstanceRouter::new(4);
        let mailbox = router.register_order(order_view("1234")).unwrap();
        let mut subscription = router.subscribe_order(&OrderId::new("1234")).unwrap();

        let mut view = order_view("1234");
        view.status = domain::OrderStatus::Processing;
        mailbox.view.send_replace(view.clone());

        assert_eq!(router.query_order(&OrderId::new("1234")).unwrap(), view);
        subscription.changed().await.unwrap();
        assert_eq!(subscription.borrow().status, domain::OrderStatus::Processing);
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(cancel().name(), "CustomerAction");
        assert_eq!(
            Signal::ShipmentCarrierUpdate(ShipmentCarrierUpdate::new(ShipmentState::Booked)).name(),
            "ShipmentCarrierUpdate"
        );
    }
}
