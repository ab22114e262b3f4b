//! Order saga runtime.
//!
//! The saga task owns the [`Order`] and is its only writer. Fulfillment
//! processors and shipment instances run as their own tasks and report back
//! through channels; after every applied change the saga publishes a fresh
//! [`OrderStatusView`] for queries.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{FulfillmentId, InstanceRef};
use domain::{
    CustomerAction, DomainEvent, FulfillmentStatus, Item, Order, OrderEvent, OrderInput,
    OrderResult, OrderStatus, PaymentState, StateMachine,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::SagaConfig;
use crate::error::{Result, SagaError};
use crate::fulfillment::FulfillmentProcessor;
use crate::gate::await_customer_action;
use crate::router::{InstanceRouter, OrderMailbox};
use crate::services::{OrderRecord, Services};

/// A running order instance.
pub struct OrderSaga {
    order: Order,
    items: Vec<Item>,
    mailbox: OrderMailbox,
    services: Services,
    router: InstanceRouter,
    config: SagaConfig,
}

impl OrderSaga {
    /// Registers the order with the router. The input must already be valid.
    pub fn register(
        input: OrderInput,
        received_at: DateTime<Utc>,
        services: Services,
        router: InstanceRouter,
        config: SagaConfig,
    ) -> Result<Self> {
        let order = Order::new(input.id, input.customer_id, received_at);
        let mailbox = router.register_order(order.view())?;
        Ok(Self {
            order,
            items: input.items,
            mailbox,
            services,
            router,
            config,
        })
    }

    /// Runs the order to a terminal status.
    #[tracing::instrument(skip(self), fields(order_id = %self.order.id()))]
    pub async fn run(mut self) -> Result<OrderResult> {
        let started = Instant::now();
        let result = self.execute().await;

        let result = match result {
            Ok(status) => Ok(OrderResult { status }),
            Err(e) => {
                self.fail(&e).await;
                Err(e)
            }
        };

        self.router
            .retire(&InstanceRef::Order(self.order.id().clone()));

        let status = self.order.status();
        metrics::counter!("orders_finished_total", "status" => status.as_str()).increment(1);
        metrics::histogram!("order_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => tracing::info!(%status, "order finished"),
            Err(e) => tracing::error!(error = %e, %status, "order failed"),
        }

        result
    }

    async fn execute(&mut self) -> Result<OrderStatus> {
        self.services
            .order_store
            .insert_order(OrderRecord {
                id: self.order.id().clone(),
                customer_id: self.order.customer_id().clone(),
                received_at: self.order.received_at(),
                status: self.order.status(),
            })
            .await?;

        let reservations = self
            .services
            .inventory
            .reserve_items(self.order.id(), &self.items)
            .await?;
        tracing::info!(reservations = reservations.len(), "items reserved");
        self.apply(OrderEvent::FulfillmentsReserved(reservations));

        if self.order.has_unavailable() {
            self.transition(OrderStatus::CustomerActionRequired).await?;

            let action = await_customer_action(
                &mut self.mailbox.customer_actions,
                self.config.customer_action_timeout,
            )
            .await?;

            match action {
                CustomerAction::Cancel => {
                    self.transition(OrderStatus::Cancelled).await?;
                    return Ok(OrderStatus::Cancelled);
                }
                CustomerAction::TimedOut => {
                    self.apply(OrderEvent::AllFulfillmentsCancelled);
                    self.transition(OrderStatus::TimedOut).await?;
                    return Ok(OrderStatus::TimedOut);
                }
                CustomerAction::Amend => {
                    self.apply(OrderEvent::UnavailableFulfillmentsCancelled);
                }
            }
        }

        self.transition(OrderStatus::Processing).await?;
        self.process_fulfillments().await;

        let settled = self.order.settled_status();
        self.transition(settled).await?;
        Ok(settled)
    }

    /// Runs one processor per startable fulfillment and applies their events
    /// and shipment updates until every processor has finished.
    async fn process_fulfillments(&mut self) {
        let (events_tx, mut events_rx) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let mut tasks = JoinSet::new();
        let mut task_fulfillments: HashMap<tokio::task::Id, FulfillmentId> = HashMap::new();

        for fulfillment in self.order.startable_fulfillments() {
            let processor = FulfillmentProcessor::new(
                self.order.id().clone(),
                self.order.customer_id().clone(),
                fulfillment.clone(),
                events_tx.clone(),
                self.services.clone(),
                self.router.clone(),
                self.config.clone(),
            );
            let handle = tasks.spawn(processor.run());
            task_fulfillments.insert(handle.id(), fulfillment.id.clone());
        }
        drop(events_tx);
        tracing::info!(fulfillments = tasks.len(), "fulfillments started");

        while !tasks.is_empty() {
            tokio::select! {
                biased;

                Some(event) = events_rx.recv() => self.apply(event),
                Some(update) = self.mailbox.shipment_updates.recv() => {
                    self.apply(OrderEvent::ShipmentStatusUpdated(update));
                }
                Some(signal) = self.mailbox.customer_actions.recv() => {
                    tracing::warn!(action = %signal.action, "customer action ignored while processing");
                }
                Some(joined) = tasks.join_next_with_id() => match joined {
                    Ok((id, _)) => {
                        task_fulfillments.remove(&id);
                    }
                    Err(e) => {
                        let Some(fulfillment_id) = task_fulfillments.remove(&e.id()) else {
                            continue;
                        };
                        tracing::error!(%fulfillment_id, error = %e, "fulfillment task aborted");
                        let payment_pending = self
                            .order
                            .fulfillment(&fulfillment_id)
                            .and_then(|f| f.payment.as_ref())
                            .is_some_and(|p| p.status == PaymentState::Pending);
                        if payment_pending {
                            self.apply(OrderEvent::PaymentFailed(fulfillment_id.clone()));
                        }
                        self.apply(OrderEvent::fulfillment_status_changed(
                            fulfillment_id.clone(),
                            FulfillmentStatus::Processing,
                        ));
                        self.apply(OrderEvent::fulfillment_status_changed(
                            fulfillment_id,
                            FulfillmentStatus::Failed,
                        ));
                    }
                },
            }
        }

        // Every processor has finished; apply what they sent last.
        while let Ok(event) = events_rx.try_recv() {
            self.apply(event);
        }
        while let Ok(update) = self.mailbox.shipment_updates.try_recv() {
            self.apply(OrderEvent::ShipmentStatusUpdated(update));
        }
    }

    fn apply(&mut self, event: OrderEvent) {
        tracing::debug!(event = event.event_type(), "applying order event");
        self.order.apply(event);
        self.mailbox.view.send_replace(self.order.view());
    }

    /// Persists a status change, then applies and publishes it.
    async fn transition(&mut self, status: OrderStatus) -> Result<()> {
        self.services
            .order_store
            .update_order_status(self.order.id(), status)
            .await?;
        self.apply(OrderEvent::StatusChanged(status));
        tracing::info!(%status, "order status changed");
        Ok(())
    }

    /// Moves the order to `Failed` after a fatal error.
    async fn fail(&mut self, error: &SagaError) {
        if self.order.is_terminal() {
            return;
        }
        self.apply(OrderEvent::StatusChanged(OrderStatus::Failed));

        if let Err(e) = self
            .services
            .order_store
            .update_order_status(self.order.id(), OrderStatus::Failed)
            .await
        {
            tracing::warn!(error = %e, cause = %error, "could not record failed status");
        }
    }
}
