//! Scrape endpoint and landing page.
//!
//! - GET /        -> HTML page linking to /metrics
//! - GET /metrics -> current snapshot in the Prometheus text format

use crate::{errors::AppError, services::snapshot::SnapshotRegistry};
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};
use prometheus::TEXT_FORMAT;

const LANDING_PAGE: &str = "<html>
<head><title>Ceph RadosGW Exporter</title></head>
<body>
<h1>Ceph RadosGW Exporter</h1>
<p><a href='/metrics'>Metrics</a></p>
</body>
</html>";

/// `GET /`
pub async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// `GET /metrics`
///
/// Encodes whichever snapshot is published at the moment of the request.
pub async fn metrics(State(registry): State<SnapshotRegistry>) -> Result<impl IntoResponse, AppError> {
    let snapshot = registry.current();
    let body = snapshot.encode()?;
    tracing::debug!(bytes = body.len(), "served metrics scrape");
    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
