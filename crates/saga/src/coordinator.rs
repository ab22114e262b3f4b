//! Saga coordinator: starts order sagas and routes signals and queries to them.

use chrono::Utc;
use common::{InstanceRef, OrderId, ShipmentId};
use domain::signals::{CUSTOMER_ACTION_SIGNAL, SHIPMENT_CARRIER_UPDATE_SIGNAL};
use domain::{
    CustomerAction, CustomerActionSignal, OrderInput, OrderResult, OrderStatus, OrderStatusView,
    ShipmentCarrierUpdate, ShipmentState, ShipmentView,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SagaConfig;
use crate::error::{Result, SagaError};
use crate::order::OrderSaga;
use crate::router::{InstanceRouter, Signal};
use crate::services::Services;

/// A started order saga.
pub struct OrderHandle {
    pub order_id: OrderId,
    handle: JoinHandle<Result<OrderResult>>,
}

impl OrderHandle {
    /// Waits for the saga to reach a terminal status.
    pub async fn wait(self) -> Result<OrderResult> {
        self.handle.await?
    }

    /// Returns true once the saga task has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Starts order sagas and is the entry point for signals and queries.
///
/// Collaborators are injected at construction and shared by every saga,
/// processor and shipment instance it starts.
#[derive(Clone)]
pub struct SagaCoordinator {
    services: Services,
    router: InstanceRouter,
    config: SagaConfig,
}

impl SagaCoordinator {
    /// Creates a new saga coordinator.
    pub fn new(services: Services, config: SagaConfig) -> Self {
        let router = InstanceRouter::new(config.mailbox_capacity)
            .with_retention(config.retained_instances);
        Self {
            services,
            router,
            config,
        }
    }

    pub fn router(&self) -> &InstanceRouter {
        &self.router
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    /// Validates the input and starts an order saga for it.
    ///
    /// Invalid input is rejected before any state is created.
    #[tracing::instrument(skip(self, input), fields(order_id = %input.id))]
    pub fn start_order(&self, input: OrderInput) -> Result<OrderHandle> {
        input.validate()?;

        let order_id = input.id.clone();
        let saga = OrderSaga::register(
            input,
            Utc::now(),
            self.services.clone(),
            self.router.clone(),
            self.config.clone(),
        )?;

        metrics::counter!("orders_started_total").increment(1);
        tracing::info!("order saga started");

        Ok(OrderHandle {
            order_id,
            handle: tokio::spawn(saga.run()),
        })
    }

    /// Sends a customer decision to an order waiting for one.
    #[tracing::instrument(skip(self))]
    pub async fn signal_customer_action(
        &self,
        order_id: &OrderId,
        action: CustomerAction,
    ) -> Result<()> {
        let instance = InstanceRef::Order(order_id.clone());
        let view = self.router.query_order(order_id)?;
        if view.status != OrderStatus::CustomerActionRequired {
            return Err(SagaError::SignalRejected {
                instance,
                signal: CUSTOMER_ACTION_SIGNAL,
            });
        }

        self.router
            .signal(
                &instance,
                Signal::CustomerAction(CustomerActionSignal::new(action)),
            )
            .await
    }

    /// Sends a carrier status update to a shipment.
    ///
    /// Only `booked`, `dispatched` and `delivered` are carrier statuses.
    #[tracing::instrument(skip(self))]
    pub async fn signal_carrier_update(
        &self,
        shipment_id: &ShipmentId,
        status: ShipmentState,
    ) -> Result<()> {
        let instance = InstanceRef::Shipment(shipment_id.clone());
        if !status.is_carrier_status() {
            return Err(SagaError::SignalRejected {
                instance,
                signal: SHIPMENT_CARRIER_UPDATE_SIGNAL,
            });
        }

        self.router
            .signal(
                &instance,
                Signal::ShipmentCarrierUpdate(ShipmentCarrierUpdate::new(status)),
            )
            .await
    }

    /// Returns the latest status projection of an order.
    pub fn query_order(&self, order_id: &OrderId) -> Result<OrderStatusView> {
        self.router.query_order(order_id)
    }

    /// Returns the latest projection of a shipment.
    pub fn query_shipment(&self, shipment_id: &ShipmentId) -> Result<ShipmentView> {
        self.router.query_shipment(shipment_id)
    }

    /// Returns a receiver that observes every status projection of an order.
    pub fn subscribe_order(&self, order_id: &OrderId) -> Result<watch::Receiver<OrderStatusView>> {
        self.router.subscribe_order(order_id)
    }

    /// Returns the latest projection of every known order, newest first.
    pub fn list_orders(&self) -> Vec<OrderStatusView> {
        let mut views: Vec<OrderStatusView> = self
            .router
            .order_ids()
            .iter()
            .filter_map(|id| self.router.query_order(id).ok())
            .collect();
        views.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        views
    }
}
