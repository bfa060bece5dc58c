//! Errors surfaced by the exporter's own HTTP endpoints.
//!
//! Gateway failures never reach scrapers: a failed cycle only leaves the
//! previous snapshot published. The one thing a scrape itself can fail on is
//! rendering that snapshot in the text exposition format.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(error = %self, "scrape failed");

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
