use anyhow::{Context, Result};
use axum::Router;
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    admin_api::RadosGwApi,
    admin_client::{AdminClient, RetryPolicy},
    collector::Collector,
    signer::{Credentials, Signer},
    snapshot::SnapshotRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting radosgw-exporter with config: {:?}", cfg);

    // --- Admin API client, signer built once ---
    let signer = Signer::for_radosgw(Credentials {
        access_key: cfg.access_key.clone(),
        secret_key: cfg.secret_key.clone(),
    });
    let retry = RetryPolicy {
        timeout: cfg.request_timeout,
        backoff: cfg.retry_backoff,
    };
    let client = AdminClient::new(signer, cfg.skip_ssl_verification, retry)
        .context("building admin API client")?;
    let api = RadosGwApi::new(&cfg.endpoint, client)?;

    // --- Collection loop ---
    let registry = SnapshotRegistry::default();
    let collector = Collector::new(api, registry.clone(), cfg.interval, cfg.fetch_concurrency);
    let collector_task = tokio::spawn(collector.run());

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(registry);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Starting HTTP server on http://{}", listener.local_addr()?);

    tokio::select! {
        served = axum::serve(listener, app).into_future() => {
            served.context("HTTP server failed")?;
        }
        collected = collector_task => {
            match collected.context("collector task panicked")? {
                Ok(()) => tracing::warn!("collector stopped"),
                Err(err) => {
                    tracing::error!(error = %err, "collection failed, shutting down");
                    return Err(err).context("collection cycle failed");
                }
            }
        }
    }

    Ok(())
}
