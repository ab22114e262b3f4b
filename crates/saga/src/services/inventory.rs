//! Inventory service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::{Item, Reservation};

use crate::error::SagaError;

/// Warehouse that ships the first available item.
pub const PRIMARY_WAREHOUSE: &str = "Warehouse A";

/// Warehouse that ships every other available item.
pub const SECONDARY_WAREHOUSE: &str = "Warehouse B";

/// SKUs containing this marker are never in stock.
pub const UNAVAILABLE_MARKER: &str = "Adidas";

/// Trait for inventory management operations.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Partitions the items into reservations, each either available from a
    /// warehouse or unavailable. Every item appears in exactly one reservation.
    async fn reserve_items(
        &self,
        order_id: &OrderId,
        items: &[Item],
    ) -> Result<Vec<Reservation>, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    reservations: HashMap<OrderId, Vec<Reservation>>,
    fail_on_reserve: bool,
}

/// In-memory inventory service for testing.
///
/// Items whose SKU contains `"Adidas"` are grouped into one leading
/// unavailable reservation. Of the rest, the first ships from
/// `Warehouse A` and the others together from `Warehouse B`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new in-memory inventory service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on the next reserve call.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_reserve = fail;
    }

    /// Returns the number of orders reserved so far.
    pub fn reservation_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .reservations
            .len()
    }

    /// Returns the reservations made for an order.
    pub fn reservations_for(&self, order_id: &OrderId) -> Option<Vec<Reservation>> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .reservations
            .get(order_id)
            .cloned()
    }
}

/// Splits items into reservations in a fixed, deterministic order.
pub fn partition(items: &[Item]) -> Vec<Reservation> {
    let (unavailable, available): (Vec<Item>, Vec<Item>) = items
        .iter()
        .cloned()
        .partition(|item| item.sku.contains(UNAVAILABLE_MARKER));

    let mut reservations = Vec::new();
    if !unavailable.is_empty() {
        reservations.push(Reservation::unavailable(unavailable));
    }

    let mut available = available.into_iter();
    if let Some(first) = available.next() {
        reservations.push(Reservation::available(PRIMARY_WAREHOUSE, vec![first]));
    }
    let rest: Vec<Item> = available.collect();
    if !rest.is_empty() {
        reservations.push(Reservation::available(SECONDARY_WAREHOUSE, rest));
    }

    reservations
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn reserve_items(
        &self,
        order_id: &OrderId,
        items: &[Item],
    ) -> Result<Vec<Reservation>, SagaError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if state.fail_on_reserve {
            return Err(SagaError::InventoryService(
                "Inventory unavailable".to_string(),
            ));
        }

        let reservations = partition(items);
        state
            .reservations
            .insert(order_id.clone(), reservations.clone());

        Ok(reservations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(reservations: &[Reservation]) -> Vec<Item> {
        reservations.iter().flat_map(|r| r.items.clone()).collect()
    }

    #[tokio::test]
    async fn test_single_item_ships_from_primary() {
        let service = InMemoryInventoryService::new();
        let items = vec![Item::new("Hiking Boots", 2)];

        let reservations = service
            .reserve_items(&OrderId::new("1"), &items)
            .await
            .unwrap();

        assert_eq!(
            reservations,
            vec![Reservation::available("Warehouse A", items)]
        );
        assert_eq!(service.reservation_count(), 1);
    }

    #[tokio::test]
    async fn test_second_item_ships_from_secondary() {
        let service = InMemoryInventoryService::new();
        let items = vec![Item::new("Hiking Boots", 2), Item::new("Tennis Shoes", 1)];

        let reservations = service
            .reserve_items(&OrderId::new("1"), &items)
            .await
            .unwrap();

        assert_eq!(reservations.len(), 2);
        assert_eq!(reservations[0].location.as_deref(), Some("Warehouse A"));
        assert_eq!(reservations[0].items, vec![Item::new("Hiking Boots", 2)]);
        assert_eq!(reservations[1].location.as_deref(), Some("Warehouse B"));
        assert_eq!(reservations[1].items, vec![Item::new("Tennis Shoes", 1)]);
    }

    #[tokio::test]
    async fn test_unavailable_items_lead() {
        let service = InMemoryInventoryService::new();
        let items = vec![Item::new("Nike Air", 2), Item::new("Adidas Classic", 1)];

        let reservations = service
            .reserve_items(&OrderId::new("1"), &items)
            .await
            .unwrap();

        assert_eq!(reservations.len(), 2);
        assert!(!reservations[0].available);
        assert!(reservations[0].location.is_none());
        assert_eq!(reservations[0].items, vec![Item::new("Adidas Classic", 1)]);
        assert!(reservations[1].available);
    }

    #[test]
    fn test_partition_is_complete() {
        let items = vec![
            Item::new("Adidas Classic", 1),
            Item::new("Hiking Boots", 2),
            Item::new("Adidas Samba", 3),
            Item::new("Nike Air", 2),
            Item::new("Tennis Shoes", 1),
        ];
        let reservations = partition(&items);

        let mut flat = flatten(&reservations);
        let mut expected = items.clone();
        flat.sort_by(|a, b| a.sku.cmp(&b.sku));
        expected.sort_by(|a, b| a.sku.cmp(&b.sku));
        assert_eq!(flat, expected);
        assert!(reservations.iter().all(|r| !r.items.is_empty()));
        assert!(
            reservations
                .iter()
                .all(|r| r.available == r.location.is_some())
        );
    }

    #[test]
    fn test_all_unavailable() {
        let reservations = partition(&[Item::new("Adidas Classic", 1)]);
        assert_eq!(reservations.len(), 1);
        assert!(!reservations[0].available);
    }

    #[tokio::test]
    async fn test_fail_on_reserve() {
        let service = InMemoryInventoryService::new();
        service.set_fail_on_reserve(true);

        let result = service
            .reserve_items(&OrderId::new("1"), &[Item::new("Hiking Boots", 1)])
            .await;
        assert!(matches!(result, Err(SagaError::InventoryService(_))));
        assert_eq!(service.reservation_count(), 0);
    }
}
