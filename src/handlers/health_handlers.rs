//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> ready once the first collection cycle has been published

use crate::services::snapshot::SnapshotRegistry;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `GET /healthz`
///
/// Always 200 OK; never touches the gateway.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// 503 until a snapshot has been published, 200 afterwards. Reports when the
/// served snapshot was collected.
pub async fn readyz(State(registry): State<SnapshotRegistry>) -> impl IntoResponse {
    let (status, label) = if registry.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "waiting for first collection")
    };
    let snapshot = registry.current();

    (
        status,
        Json(ReadyResponse {
            status: label.into(),
            collected_at: snapshot.collected_at(),
            series: snapshot.series_count(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    collected_at: Option<DateTime<Utc>>,
    series: usize,
}
