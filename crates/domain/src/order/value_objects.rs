//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Money amount in the smallest currency unit to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * quantity as i64)
    }

    /// Returns the given percentage of this amount, rounded down.
    pub fn percent(&self, percent: i64) -> Money {
        Money(self.0 * percent / 100)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A line of an order: a SKU and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Stock keeping unit.
    pub sku: String,

    /// Quantity ordered.
    pub quantity: u32,
}

impl Item {
    /// Creates a new item.
    pub fn new(sku: impl Into<String>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }

    /// Checks the quantity is positive.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                sku: self.sku.clone(),
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// A group of items the inventory service can (or cannot) ship together.
///
/// `location` is present if and only if the reservation is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub available: bool,
    pub location: Option<String>,
    pub items: Vec<Item>,
}

impl Reservation {
    /// Creates an available reservation shipping from `location`.
    pub fn available(location: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            available: true,
            location: Some(location.into()),
            items,
        }
    }

    /// Creates a reservation for items that cannot be supplied.
    pub fn unavailable(items: Vec<Item>) -> Self {
        Self {
            available: false,
            location: None,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        assert_eq!((a + Money::from_cents(500)).cents(), 1500);
        assert_eq!(a.multiply(3).cents(), 3000);
        assert_eq!(Money::from_cents(7000).percent(20).cents(), 1400);

        let total: Money = [a, a, Money::from_cents(1)].into_iter().sum();
        assert_eq!(total.cents(), 2001);
    }

    #[test]
    fn test_item_validation() {
        assert!(Item::new("Hiking Boots", 2).validate().is_ok());
        assert_eq!(
            Item::new("Hiking Boots", 0).validate(),
            Err(DomainError::InvalidQuantity {
                sku: "Hiking Boots".to_string(),
                quantity: 0
            })
        );
    }

    #[test]
    fn test_reservation_location_only_when_available() {
        let available = Reservation::available("Warehouse A", vec![Item::new("Nike Air", 2)]);
        assert!(available.available);
        assert_eq!(available.location.as_deref(), Some("Warehouse A"));

        let unavailable = Reservation::unavailable(vec![Item::new("Adidas Classic", 1)]);
        assert!(!unavailable.available);
        assert!(unavailable.location.is_none());
    }
}
