//! The collection cycle: list everything, fetch per-entity details, build a
//! fresh snapshot, publish it.
//!
//! Per-entity failures (empty or undecodable bodies) drop only that entity's
//! series. A failed list call abandons the cycle and leaves the previous
//! snapshot in place. Status errors are fatal and end [`Collector::run`].

use crate::services::{
    admin_api::RadosGwApi,
    admin_client::{AdminError, AdminResult},
    snapshot::{BucketSeries, CycleData, MetricsSnapshot, SnapshotRegistry, UserSeries},
};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error("failed to build metrics snapshot: {0}")]
    Snapshot(#[from] prometheus::Error),
}

impl CycleError {
    pub fn is_fatal(&self) -> bool {
        match self {
            CycleError::Admin(err) => err.is_fatal(),
            CycleError::Snapshot(_) => true,
        }
    }
}

pub struct Collector {
    api: RadosGwApi,
    registry: SnapshotRegistry,
    interval: Duration,
    concurrency: usize,
}

impl Collector {
    pub fn new(api: RadosGwApi, registry: SnapshotRegistry, interval: Duration, concurrency: usize) -> Self {
        Self {
            api,
            registry,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    /// Collect on every tick until a fatal error occurs.
    ///
    /// The first cycle starts immediately. Cycles never overlap; a cycle that
    /// overruns the interval pushes the next tick back.
    pub async fn run(self) -> Result<(), CycleError> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.collect_once().await {
                Ok(snapshot) => self.registry.publish(snapshot),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "collection cycle abandoned, keeping previous snapshot");
                }
            }
        }
    }

    /// Run one full cycle and return the resulting snapshot without publishing it.
    pub async fn collect_once(&self) -> Result<MetricsSnapshot, CycleError> {
        let started = Instant::now();
        info!("collection cycle started");

        let users = self.api.list_users().await?;
        let buckets = self.api.list_buckets().await?;

        let users: Vec<UserSeries> = stream::iter(users)
            .map(|uid| self.collect_user(uid))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let buckets: Vec<BucketSeries> = stream::iter(buckets)
            .map(|bucket| self.collect_bucket(bucket))
            .buffered(self.concurrency)
            .try_filter_map(|series| async move { Ok(series) })
            .try_collect()
            .await?;

        let data = CycleData { buckets, users };
        let snapshot = MetricsSnapshot::build(&data, Utc::now())?;

        info!(
            users = data.users.len(),
            buckets = data.buckets.len(),
            series = snapshot.series_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection cycle finished"
        );
        Ok(snapshot)
    }

    async fn collect_user(&self, uid: String) -> AdminResult<UserSeries> {
        let user_quota = skip_on_soft_error(self.api.user_quota(&uid).await)?;
        let bucket_quota = skip_on_soft_error(self.api.bucket_quota(&uid).await)?;
        let stats = skip_on_soft_error(self.api.user_detail(&uid).await)?.map(|detail| detail.stats);

        Ok(UserSeries {
            owner: uid,
            stats,
            user_quota,
            bucket_quota,
        })
    }

    async fn collect_bucket(&self, bucket: String) -> AdminResult<Option<BucketSeries>> {
        let Some(detail) = skip_on_soft_error(self.api.bucket_detail(&bucket).await)? else {
            return Ok(None);
        };
        let usage = detail.main_usage();

        Ok(Some(BucketSeries {
            bucket,
            owner: detail.owner,
            num_objects: usage.num_objects,
            size_kb_actual: usage.size_kb_actual,
            num_shards: detail.num_shards,
        }))
    }
}

/// Log and swallow per-entity errors; pass fatal ones through.
fn skip_on_soft_error<T>(result: AdminResult<T>) -> AdminResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            warn!(error = %err, "skipping entity for this cycle");
            Ok(None)
        }
    }
}
