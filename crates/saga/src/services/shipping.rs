//! Shipping service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::ShipmentId;
use domain::Item;

use crate::error::SagaError;

/// Result of a successful booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingResult {
    /// Reference assigned by the courier.
    pub courier_reference: String,
}

/// Trait for shipment booking operations.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Books a courier for the items of a shipment.
    async fn book_shipment(
        &self,
        reference: &ShipmentId,
        items: &[Item],
    ) -> Result<BookingResult, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    bookings: HashMap<ShipmentId, (Vec<Item>, String)>,
    fail_on_book: bool,
    delay: Option<Duration>,
}

/// In-memory shipping service for testing.
///
/// Courier references are `"{reference}:1234"`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a new in-memory shipping service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every booking call.
    pub fn set_fail_on_book(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_book = fail;
    }

    /// Makes every booking call wait before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).delay = delay;
    }

    /// Returns the number of bookings made.
    pub fn booking_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .bookings
            .len()
    }

    /// Returns true if a booking exists for the given shipment.
    pub fn has_booking(&self, reference: &ShipmentId) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .bookings
            .contains_key(reference)
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn book_shipment(
        &self,
        reference: &ShipmentId,
        items: &[Item],
    ) -> Result<BookingResult, SagaError> {
        let delay = self.state.read().unwrap_or_else(|e| e.into_inner()).delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if state.fail_on_book {
            return Err(SagaError::ShippingService("No courier available".to_string()));
        }

        let courier_reference = format!("{reference}:1234");
        state.bookings.insert(
            reference.clone(),
            (items.to_vec(), courier_reference.clone()),
        );

        Ok(BookingResult { courier_reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_book_shipment() {
        let service = InMemoryShippingService::new();
        let reference = ShipmentId::new("1234:1");

        let result = service
            .book_shipment(&reference, &[Item::new("Hiking Boots", 2)])
            .await
            .unwrap();

        assert_eq!(result.courier_reference, "1234:1:1234");
        assert_eq!(service.booking_count(), 1);
        assert!(service.has_booking(&reference));
    }

    #[tokio::test]
    async fn test_fail_on_book() {
        let service = InMemoryShippingService::new();
        service.set_fail_on_book(true);

        let result = service
            .book_shipment(&ShipmentId::new("1234:1"), &[Item::new("Hiking Boots", 2)])
            .await;
        assert!(matches!(result, Err(SagaError::ShippingService(_))));
        assert_eq!(service.booking_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let service = InMemoryShippingService::new();
        service.set_delay(Some(Duration::from_secs(10)));

        let start = tokio::time::Instant::now();
        service
            .book_shipment(&ShipmentId::new("1234:1"), &[Item::new("Hiking Boots", 2)])
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
