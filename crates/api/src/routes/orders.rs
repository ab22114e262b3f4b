//! Order endpoints: start, query and customer decisions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, OrderId};
use domain::{CustomerAction, Item, OrderInput, OrderStatus, OrderStatusView};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Generated when absent.
    pub id: Option<String>,
    #[serde(rename = "customerID", default)]
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Deserialize)]
pub struct CustomerActionRequest {
    pub action: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub id: OrderId,
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct SignalAcceptedResponse {
    pub signal: &'static str,
}

// -- Handlers --

/// POST /orders: validates the order and starts its saga.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let id = req.id.map(OrderId::new).unwrap_or_else(OrderId::generate);
    let input = OrderInput::new(id, CustomerId::new(req.customer_id), req.items);

    // The saga keeps running after the handle is dropped.
    let handle = state.coordinator.start_order(input)?;
    let view = state.coordinator.query_order(&handle.order_id)?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            id: view.id,
            status: view.status,
        }),
    ))
}

/// GET /orders: latest status of every known order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<OrderStatusView>> {
    Json(state.coordinator.list_orders())
}

/// GET /orders/{id}: the order's status query.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusView>, ApiError> {
    Ok(Json(state.coordinator.query_order(&OrderId::new(id))?))
}

/// POST /orders/{id}/action: delivers a `cancel` or `amend` decision.
#[tracing::instrument(skip(state, req))]
pub async fn action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CustomerActionRequest>,
) -> Result<(StatusCode, Json<SignalAcceptedResponse>), ApiError> {
    let action: CustomerAction = req.action.parse()?;
    if !action.is_customer_choice() {
        return Err(ApiError::BadRequest(format!(
            "{action} is not a customer decision"
        )));
    }

    state
        .coordinator
        .signal_customer_action(&OrderId::new(id), action)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SignalAcceptedResponse {
            signal: domain::signals::CUSTOMER_ACTION_SIGNAL,
        }),
    ))
}
