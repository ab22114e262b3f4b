//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, FulfillmentId};
use domain::{Item, Money, PaymentState, PaymentStatus};

use crate::error::SagaError;

/// Default unit price for SKUs without a configured price.
pub const DEFAULT_UNIT_PRICE: Money = Money::from_cents(3500);

/// Flat shipping cost per unit.
pub const SHIPPING_PER_UNIT: Money = Money::from_cents(500);

/// Tax rate applied to the subtotal, in percent.
pub const TAX_PERCENT: i64 = 20;

/// A charge for the items of one fulfillment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub customer_id: CustomerId,
    /// Fulfillment being paid for.
    pub reference: FulfillmentId,
    pub items: Vec<Item>,
    /// Repeating a charge with the same key must not charge twice.
    pub idempotency_key: String,
}

/// Outcome of a charge the gateway processed.
///
/// `success == false` is a business decline, not a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeResult {
    pub success: bool,
    pub auth_code: String,
    pub sub_total: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl ChargeResult {
    /// Converts the result into the payment snapshot kept on a fulfillment.
    pub fn into_payment_status(self, idempotency_key: String) -> PaymentStatus {
        PaymentStatus {
            status: if self.success {
                PaymentState::Success
            } else {
                PaymentState::Failed
            },
            sub_total: self.sub_total,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
            idempotency_key,
        }
    }
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a customer. Idempotent per `idempotency_key`.
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: HashMap<String, (ChargeRequest, ChargeResult)>,
    prices: HashMap<String, Money>,
    calls: usize,
    next_auth: u32,
    fail_on_charge: bool,
    decline: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail every charge call.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_charge = fail;
    }

    /// Configures the gateway to decline every new charge.
    pub fn set_decline(&self, decline: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .decline = decline;
    }

    /// Sets the unit price of a SKU.
    pub fn set_price(&self, sku: impl Into<String>, price: Money) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .prices
            .insert(sku.into(), price);
    }

    /// Returns the number of distinct charges made.
    pub fn charge_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .charges
            .len()
    }

    /// Returns the number of charge calls received, including duplicates.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).calls
    }

    /// Returns the idempotency keys used for a fulfillment.
    pub fn keys_for(&self, reference: &FulfillmentId) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .charges
            .iter()
            .filter(|(_, (request, _))| &request.reference == reference)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

fn price(prices: &HashMap<String, Money>, items: &[Item]) -> (Money, Money, Money, Money) {
    let sub_total: Money = items
        .iter()
        .map(|item| {
            prices
                .get(&item.sku)
                .copied()
                .unwrap_or(DEFAULT_UNIT_PRICE)
                .multiply(item.quantity)
        })
        .sum();
    let tax = sub_total.percent(TAX_PERCENT);
    let shipping: Money = items
        .iter()
        .map(|item| SHIPPING_PER_UNIT.multiply(item.quantity))
        .sum();
    (sub_total, tax, shipping, sub_total + tax + shipping)
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, SagaError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.calls += 1;

        if state.fail_on_charge {
            return Err(SagaError::PaymentService(
                "Payment gateway unreachable".to_string(),
            ));
        }

        if let Some((_, result)) = state.charges.get(&request.idempotency_key) {
            return Ok(result.clone());
        }

        let (sub_total, tax, shipping, total) = price(&state.prices, &request.items);
        let result = if state.decline {
            ChargeResult {
                success: false,
                auth_code: String::new(),
                sub_total,
                tax,
                shipping,
                total,
            }
        } else {
            state.next_auth += 1;
            ChargeResult {
                success: true,
                auth_code: format!("AUTH-{:04}", state.next_auth),
                sub_total,
                tax,
                shipping,
                total,
            }
        };

        state
            .charges
            .insert(request.idempotency_key.clone(), (request, result.clone()));

        Ok(result)
    }
}
