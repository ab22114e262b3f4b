//! Shipment instance runtime.
//!
//! Books a courier once, then follows carrier updates until the shipment is
//! delivered. Every status change is published, reported to the requesting
//! order and announced to the customer.

use common::{InstanceRef, OrderId, ShipmentId};
use domain::signals::SHIPMENT_CARRIER_UPDATE_SIGNAL;
use domain::{Item, Shipment, ShipmentEvent, StateMachine};

use crate::config::SagaConfig;
use crate::error::{Result, SagaError};
use crate::router::{InstanceRouter, ShipmentMailbox, Signal};
use crate::services::{NotificationKind, Services, ShipmentNotification};

/// Input of a shipment instance.
#[derive(Debug, Clone)]
pub struct ShipmentInput {
    pub id: ShipmentId,
    /// Order to report status changes to.
    pub requestor: OrderId,
    pub items: Vec<Item>,
}

/// Value returned by a delivered shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentResult {
    pub courier_reference: String,
}

/// A running shipment instance.
pub struct ShipmentWorkflow {
    shipment: Shipment,
    items: Vec<Item>,
    mailbox: ShipmentMailbox,
    services: Services,
    router: InstanceRouter,
    config: SagaConfig,
}

impl ShipmentWorkflow {
    /// Registers the shipment's mailbox so carrier updates can be addressed
    /// to it before booking completes.
    pub fn register(
        input: ShipmentInput,
        services: Services,
        router: InstanceRouter,
        config: SagaConfig,
    ) -> Result<Self> {
        let shipment = Shipment::new(input.id, input.requestor);
        let mailbox = router.register_shipment(shipment.view())?;
        Ok(Self {
            shipment,
            items: input.items,
            mailbox,
            services,
            router,
            config,
        })
    }

    /// Runs the shipment to delivery.
    #[tracing::instrument(
        skip(self),
        fields(shipment_id = %self.shipment.id(), order_id = %self.shipment.requestor())
    )]
    pub async fn run(mut self) -> Result<ShipmentResult> {
        let result = self.execute().await;
        self.router
            .retire(&InstanceRef::Shipment(self.shipment.id().clone()));
        result
    }

    async fn execute(&mut self) -> Result<ShipmentResult> {
        let booking = tokio::time::timeout(
            self.config.booking_timeout,
            self.services
                .shipping
                .book_shipment(self.shipment.id(), &self.items),
        )
        .await
        .map_err(|_| SagaError::BookingTimedOut(self.config.booking_timeout))??;

        tracing::info!(courier_reference = %booking.courier_reference, "shipment booked");
        self.transition(ShipmentEvent::booked(booking.courier_reference.clone()))
            .await?;

        while !self.shipment.is_terminal() {
            let update = self
                .mailbox
                .carrier_updates
                .recv()
                .await
                .ok_or(SagaError::MailboxClosed(SHIPMENT_CARRIER_UPDATE_SIGNAL))?;

            if !update.status.is_carrier_status() {
                tracing::warn!(status = %update.status, "carrier update ignored");
                continue;
            }
            if update.status != self.shipment.status() {
                tracing::info!(
                    from = %self.shipment.status(),
                    to = %update.status,
                    "carrier update received"
                );
            }
            self.transition(ShipmentEvent::carrier_updated(update.status))
                .await?;
        }

        Ok(ShipmentResult {
            courier_reference: booking.courier_reference,
        })
    }

    async fn transition(&mut self, event: ShipmentEvent) -> Result<()> {
        self.shipment.apply(event);
        self.mailbox.view.send_replace(self.shipment.view());

        let status = self.shipment.status();
        metrics::counter!("shipment_status_updates_total", "status" => status.as_str())
            .increment(1);

        let requestor = InstanceRef::Order(self.shipment.requestor().clone());
        self.router
            .signal(
                &requestor,
                Signal::ShipmentStatusUpdated(self.shipment.status_update()),
            )
            .await?;

        if let Some(kind) = NotificationKind::for_status(status) {
            let notification = ShipmentNotification {
                kind,
                order_id: self.shipment.requestor().clone(),
            };
            if let Err(e) = self.services.notification.notify(notification).await {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(error = %e, %status, "shipment notification failed");
            }
        }

        Ok(())
    }
}
