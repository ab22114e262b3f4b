//! HTTP API server for the order orchestration saga.
//!
//! A thin JSON adapter over [`SagaCoordinator`]: it starts orders, answers
//! status queries and turns customer and carrier callbacks into signals.
//! Structured logging comes from `tracing` and metrics are exported in
//! Prometheus format.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryServices, SagaConfig, SagaCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/action", post(routes::orders::action))
        .route("/shipments/{id}", get(routes::shipments::get))
        .route(
            "/shipments/{id}/status",
            post(routes::shipments::update_status),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state backed by in-memory collaborators.
///
/// The returned handles share state with the coordinator's collaborators.
pub fn create_default_state(
    config: SagaConfig,
    metrics: PrometheusHandle,
) -> (Arc<AppState>, InMemoryServices) {
    let mocks = InMemoryServices::new();
    let coordinator = SagaCoordinator::new(mocks.services(), config);
    let state = Arc::new(AppState {
        coordinator,
        metrics,
    });
    (state, mocks)
}
