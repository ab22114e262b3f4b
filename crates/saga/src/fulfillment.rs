//! Fulfillment processor.
//!
//! Drives one fulfillment through payment then shipment. The processor never
//! touches the order directly: each change is sent to the order saga as an
//! [`OrderEvent`] and applied there.

use common::{CustomerId, FulfillmentId, OrderId, ShipmentId};
use domain::{Fulfillment, FulfillmentStatus, OrderEvent};
use tokio::sync::mpsc;

use crate::config::SagaConfig;
use crate::error::{Result, SagaError};
use crate::router::InstanceRouter;
use crate::services::{ChargeRequest, Services};
use crate::shipment::{ShipmentInput, ShipmentWorkflow};

/// Everything a processor needs to run one fulfillment.
pub struct FulfillmentProcessor {
    order_id: OrderId,
    customer_id: CustomerId,
    fulfillment: Fulfillment,
    events: mpsc::Sender<OrderEvent>,
    services: Services,
    router: InstanceRouter,
    config: SagaConfig,
}

impl FulfillmentProcessor {
    /// Creates a processor for a snapshot of the fulfillment.
    pub fn new(
        order_id: OrderId,
        customer_id: CustomerId,
        fulfillment: Fulfillment,
        events: mpsc::Sender<OrderEvent>,
        services: Services,
        router: InstanceRouter,
        config: SagaConfig,
    ) -> Self {
        Self {
            order_id,
            customer_id,
            fulfillment,
            events,
            services,
            router,
            config,
        }
    }

    /// Runs the fulfillment to a leaf state and returns it.
    ///
    /// Collaborator errors mark the fulfillment failed before they are
    /// returned. They never reach sibling fulfillments.
    #[tracing::instrument(skip(self), fields(order_id = %self.order_id, fulfillment_id = %self.fulfillment.id))]
    pub async fn run(self) -> Result<FulfillmentStatus> {
        if self.fulfillment.status == FulfillmentStatus::Cancelled {
            tracing::debug!("fulfillment cancelled, skipping");
            return Ok(FulfillmentStatus::Cancelled);
        }

        let result = self.process().await;
        let status = match &result {
            Ok(status) => *status,
            Err(_) => FulfillmentStatus::Failed,
        };

        metrics::counter!("fulfillments_finished_total", "status" => status.as_str()).increment(1);
        match &result {
            Ok(status) => tracing::info!(%status, "fulfillment finished"),
            Err(e) => tracing::warn!(error = %e, "fulfillment failed"),
        }
        result
    }

    async fn process(&self) -> Result<FulfillmentStatus> {
        let id = self.fulfillment.id.clone();
        self.set_status(FulfillmentStatus::Processing).await?;

        if !self.pay(&id).await? {
            self.set_status(FulfillmentStatus::Failed).await?;
            return Ok(FulfillmentStatus::Failed);
        }

        if let Err(e) = self.ship(&id).await {
            self.set_status(FulfillmentStatus::Failed).await?;
            return Err(e);
        }

        self.set_status(FulfillmentStatus::Completed).await?;
        Ok(FulfillmentStatus::Completed)
    }

    /// Charges the customer. Returns false on a business decline.
    async fn pay(&self, id: &FulfillmentId) -> Result<bool> {
        let idempotency_key = match self.fulfillment.idempotency_key() {
            Some(key) => key.to_string(),
            None => {
                let key = uuid::Uuid::new_v4().to_string();
                self.emit(OrderEvent::payment_started(id.clone(), key.clone()))
                    .await?;
                key
            }
        };

        let request = ChargeRequest {
            customer_id: self.customer_id.clone(),
            reference: id.clone(),
            items: self.fulfillment.items.clone(),
            idempotency_key: idempotency_key.clone(),
        };

        match self.services.payment.charge(request).await {
            Ok(result) => {
                let success = result.success;
                let outcome = if success { "success" } else { "declined" };
                metrics::counter!("payments_total", "outcome" => outcome).increment(1);
                tracing::info!(outcome, total = %result.total, "payment processed");

                let payment = result.into_payment_status(idempotency_key);
                self.emit(OrderEvent::payment_recorded(id.clone(), payment))
                    .await?;
                Ok(success)
            }
            Err(e) => {
                metrics::counter!("payments_total", "outcome" => "error").increment(1);
                self.emit(OrderEvent::PaymentFailed(id.clone())).await?;
                self.set_status(FulfillmentStatus::Failed).await?;
                Err(e)
            }
        }
    }

    /// Spawns the shipment instance and waits for delivery.
    async fn ship(&self, id: &FulfillmentId) -> Result<()> {
        let workflow = ShipmentWorkflow::register(
            ShipmentInput {
                id: ShipmentId::from(id),
                requestor: self.order_id.clone(),
                items: self.fulfillment.items.clone(),
            },
            self.services.clone(),
            self.router.clone(),
            self.config.clone(),
        )?;
        self.emit(OrderEvent::shipment_started(id.clone())).await?;

        let result = tokio::spawn(workflow.run()).await??;
        tracing::debug!(courier_reference = %result.courier_reference, "shipment delivered");
        Ok(())
    }

    async fn set_status(&self, status: FulfillmentStatus) -> Result<()> {
        self.emit(OrderEvent::fulfillment_status_changed(
            self.fulfillment.id.clone(),
            status,
        ))
        .await
    }

    async fn emit(&self, event: OrderEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| SagaError::MailboxClosed("OrderEvent"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::InstanceRef;
    use domain::{
        Item, Order, PaymentState, PaymentStatus, ShipmentCarrierUpdate, ShipmentState,
    };

    use crate::router::{OrderMailbox, Signal};
    use crate::services::InMemoryServices;

    struct Fixture {
        router: InstanceRouter,
        mocks: InMemoryServices,
        _order_mailbox: OrderMailbox,
    }

    fn fixture() -> Fixture {
        let router = InstanceRouter::new(16);
        let order = Order::new(OrderId::new("1234"), CustomerId::new("c1"), Utc::now());
        let order_mailbox = router.register_order(order.view()).unwrap();
        Fixture {
            router,
            mocks: InMemoryServices::new(),
            _order_mailbox: order_mailbox,
        }
    }

    fn fulfillment(status: FulfillmentStatus, payment: Option<PaymentStatus>) -> Fulfillment {
        Fulfillment {
            id: FulfillmentId::new(&OrderId::new("1234"), 1),
            items: vec![Item::new("Hiking Boots", 2)],
            location: Some("Warehouse A".to_string()),
            status,
            payment,
            shipment: None,
        }
    }

    fn processor(
        f: &Fixture,
        fulfillment: Fulfillment,
    ) -> (FulfillmentProcessor, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let processor = FulfillmentProcessor::new(
            OrderId::new("1234"),
            CustomerId::new("c1"),
            fulfillment,
            tx,
            f.mocks.services(),
            f.router.clone(),
            SagaConfig::default(),
        );
        (processor, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<OrderEvent>) -> Vec<OrderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn statuses(events: &[OrderEvent]) -> Vec<FulfillmentStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                OrderEvent::FulfillmentStatusChanged(data) => Some(data.status),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_cancelled_is_skipped() {
        let f = fixture();
        let (processor, mut rx) = processor(&f, fulfillment(FulfillmentStatus::Cancelled, None));

        let status = processor.run().await.unwrap();
        assert_eq!(status, FulfillmentStatus::Cancelled);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(f.mocks.payment.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completes_after_delivery() {
        let f = fixture();
        let (processor, mut rx) = processor(&f, fulfillment(FulfillmentStatus::Pending, None));
        let handle = tokio::spawn(processor.run());

        // The shipment registers itself before ShipmentStarted is emitted.
        loop {
            if let Some(OrderEvent::ShipmentStarted(_)) = rx.recv().await {
                break;
            }
        }
        f.router
            .signal(
                &InstanceRef::Shipment(ShipmentId::new("1234:1")),
                Signal::ShipmentCarrierUpdate(ShipmentCarrierUpdate::new(
                    ShipmentState::Delivered,
                )),
            )
            .await
            .unwrap();

        assert_eq!(handle.await.unwrap().unwrap(), FulfillmentStatus::Completed);
        assert_eq!(
            statuses(&drain(&mut rx)),
            vec![FulfillmentStatus::Completed]
        );
        assert_eq!(f.mocks.payment.charge_count(), 1);
        assert_eq!(f.mocks.shipping.booking_count(), 1);
    }

    #[tokio::test]
    async fn test_decline_fails_without_shipment() {
        let f = fixture();
        f.mocks.payment.set_decline(true);
        let (processor, mut rx) = processor(&f, fulfillment(FulfillmentStatus::Pending, None));

        assert_eq!(processor.run().await.unwrap(), FulfillmentStatus::Failed);

        let events = drain(&mut rx);
        assert_eq!(
            statuses(&events),
            vec![FulfillmentStatus::Processing, FulfillmentStatus::Failed]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            OrderEvent::PaymentRecorded(data) if data.payment.status == PaymentState::Failed
        )));
        assert_eq!(f.mocks.shipping.booking_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_error_fails_and_propagates() {
        let f = fixture();
        f.mocks.payment.set_fail_on_charge(true);
        let (processor, mut rx) = processor(&f, fulfillment(FulfillmentStatus::Pending, None));

        let result = processor.run().await;
        assert!(matches!(result, Err(SagaError::PaymentService(_))));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, OrderEvent::PaymentFailed(_))));
        assert_eq!(statuses(&events).last(), Some(&FulfillmentStatus::Failed));
        assert_eq!(f.mocks.shipping.booking_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_key_is_reused() {
        let f = fixture();
        f.mocks.shipping.set_fail_on_book(true);
        let existing = PaymentStatus::pending("key-from-first-attempt");
        let (processor, mut rx) = processor(
            &f,
            fulfillment(FulfillmentStatus::Processing, Some(existing)),
        );

        let _ = processor.run().await;

        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, OrderEvent::PaymentStarted(_))));
        assert_eq!(
            f.mocks
                .payment
                .keys_for(&FulfillmentId::new(&OrderId::new("1234"), 1)),
            vec!["key-from-first-attempt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_booking_failure_fails_fulfillment() {
        let f = fixture();
        f.mocks.shipping.set_fail_on_book(true);
        let (processor, mut rx) = processor(&f, fulfillment(FulfillmentStatus::Pending, None));

        let result = processor.run().await;
        assert!(matches!(result, Err(SagaError::ShippingService(_))));
        assert_eq!(
            statuses(&drain(&mut rx)),
            vec![FulfillmentStatus::Processing, FulfillmentStatus::Failed]
        );
        assert_eq!(f.mocks.payment.charge_count(), 1);
    }
}
