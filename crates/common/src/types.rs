use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an order instance.
///
/// Order IDs are supplied by the caller when an order is submitted, so
/// they are opaque strings rather than UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random order ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ID is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the customer who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CustomerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a fulfillment within an order: `{order_id}:{index}`.
///
/// Indexes are 1-based and follow the order in which reservations were
/// returned by the inventory service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FulfillmentId(String);

impl FulfillmentId {
    /// Derives the ID of the `index`-th fulfillment (1-based) of an order.
    pub fn new(order_id: &OrderId, index: usize) -> Self {
        Self(format!("{}:{}", order_id, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FulfillmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a shipment instance.
///
/// A shipment is spawned once per fulfillment and carries the same textual
/// ID, which is how status updates are routed back to the fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(String);

impl ShipmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this shipment belongs to the given fulfillment.
    pub fn matches(&self, fulfillment_id: &FulfillmentId) -> bool {
        self.0 == fulfillment_id.0
    }
}

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&FulfillmentId> for ShipmentId {
    fn from(id: &FulfillmentId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&str> for ShipmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Address of a running instance.
///
/// Used to route signals and queries without passing bare strings around.
/// Holding an `InstanceRef` confers no ownership over the instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum InstanceRef {
    Order(OrderId),
    Shipment(ShipmentId),
}

impl InstanceRef {
    /// Returns the instance kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            InstanceRef::Order(_) => "order",
            InstanceRef::Shipment(_) => "shipment",
        }
    }
}

impl std::fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceRef::Order(id) => write!(f, "order/{}", id),
            InstanceRef::Shipment(id) => write!(f, "shipment/{}", id),
        }
    }
}

impl From<OrderId> for InstanceRef {
    fn from(id: OrderId) -> Self {
        InstanceRef::Order(id)
    }
}

impl From<ShipmentId> for InstanceRef {
    fn from(id: ShipmentId) -> Self {
        InstanceRef::Shipment(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_order_ids_are_unique() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2);
        assert!(!id1.is_blank());
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(OrderId::new("").is_blank());
        assert!(OrderId::new("   ").is_blank());
        assert!(CustomerId::new("").is_blank());
        assert!(!CustomerId::new("c-1").is_blank());
    }

    #[test]
    fn fulfillment_id_is_order_id_and_index() {
        let order_id = OrderId::new("1234");
        assert_eq!(FulfillmentId::new(&order_id, 1).as_str(), "1234:1");
        assert_eq!(FulfillmentId::new(&order_id, 2).to_string(), "1234:2");
    }

    #[test]
    fn shipment_id_matches_its_fulfillment() {
        let fulfillment_id = FulfillmentId::new(&OrderId::new("A1"), 3);
        let shipment_id = ShipmentId::from(&fulfillment_id);
        assert!(shipment_id.matches(&fulfillment_id));
        assert!(!ShipmentId::new("A1:4").matches(&fulfillment_id));
    }

    #[test]
    fn instance_ref_display_and_kind() {
        let order = InstanceRef::from(OrderId::new("1234"));
        let shipment = InstanceRef::from(ShipmentId::new("1234:1"));
        assert_eq!(order.kind(), "order");
        assert_eq!(shipment.kind(), "shipment");
        assert_eq!(order.to_string(), "order/1234");
        assert_eq!(shipment.to_string(), "shipment/1234:1");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&OrderId::new("1234")).unwrap();
        assert_eq!(json, "\"1234\"");

        let instance = InstanceRef::Shipment(ShipmentId::new("1234:1"));
        let json = serde_json::to_string(&instance).unwrap();
        let back: InstanceRef = serde_json::from_str(&json).unwrap();
        assert_eq!(instance, back);
    }
}
