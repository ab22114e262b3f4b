//! Shipment endpoints: carrier webhooks and the shipment query.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ShipmentId;
use domain::{ShipmentState, ShipmentView};
use serde::Deserialize;

use super::AppState;
use super::orders::SignalAcceptedResponse;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CarrierStatusRequest {
    pub status: String,
}

/// GET /shipments/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentView>, ApiError> {
    Ok(Json(state.coordinator.query_shipment(&ShipmentId::new(id))?))
}

/// POST /shipments/{id}/status: a carrier reports a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CarrierStatusRequest>,
) -> Result<(StatusCode, Json<SignalAcceptedResponse>), ApiError> {
    let status: ShipmentState = req.status.parse()?;
    if !status.is_carrier_status() {
        return Err(ApiError::BadRequest(format!(
            "{status} is not a carrier status"
        )));
    }

    state
        .coordinator
        .signal_carrier_update(&ShipmentId::new(id), status)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SignalAcceptedResponse {
            signal: domain::signals::SHIPMENT_CARRIER_UPDATE_SIGNAL,
        }),
    ))
}
