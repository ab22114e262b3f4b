//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod shipments;

use metrics_exporter_prometheus::PrometheusHandle;
use saga::SagaCoordinator;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: SagaCoordinator,
    pub metrics: PrometheusHandle,
}
