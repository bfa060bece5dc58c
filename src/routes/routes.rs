//! Routes exposed by the exporter.
//!
//! - `GET /`       -> landing page
//! - `GET /metrics` -> Prometheus scrape endpoint
//! - `GET /healthz` -> liveness
//! - `GET /readyz` -> readiness (first snapshot published)

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        metrics_handlers::{landing, metrics},
    },
    services::snapshot::SnapshotRegistry,
};
use axum::{Router, routing::get};

/// Build the router. Handlers share the snapshot registry as state.
pub fn routes() -> Router<SnapshotRegistry> {
    Router::new()
        .route("/", get(landing))
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
