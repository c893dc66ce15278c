use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{handlers, registry::MetricsRegistry};

pub struct ExporterState {
    pub registry: Arc<MetricsRegistry>,
    pub telemetry_path: String,
}

impl ExporterState {
    pub fn new(registry: Arc<MetricsRegistry>, telemetry_path: impl Into<String>) -> Self {
        Self {
            registry,
            telemetry_path: telemetry_path.into(),
        }
    }
}

/// Serves the exposition at the telemetry path; every other path
/// permanently redirects there.
pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    let telemetry_path = state.telemetry_path.clone();

    Router::new()
        .route(&telemetry_path, get(handlers::metrics::prometheus_metrics))
        .fallback(handlers::metrics::redirect_to_metrics)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
