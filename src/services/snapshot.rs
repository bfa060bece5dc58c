//! Published metrics state.
//!
//! Every collection cycle builds a fresh [`MetricsSnapshot`] with its own
//! Prometheus registry and hands it to [`SnapshotRegistry::publish`], which
//! swaps the pointer in one step. Scrapes load whatever pointer is current, so
//! they see either the previous cycle or the new one in full, and series for
//! deleted users or buckets vanish with the old snapshot.

use crate::models::{bucket::UsageStats, quota::Quota};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

const NAMESPACE: &str = "ceph_radosgw";

/// Per-bucket figures, taken from `rgw.main` usage.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSeries {
    pub bucket: String,
    pub owner: String,
    pub num_objects: i64,
    pub size_kb_actual: i64,
    pub num_shards: i64,
}

/// Per-user figures. A `None` field means that fetch failed this cycle and
/// its series are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSeries {
    pub owner: String,
    pub stats: Option<UsageStats>,
    pub user_quota: Option<Quota>,
    pub bucket_quota: Option<Quota>,
}

/// Everything one cycle collected.
#[derive(Debug, Clone, Default)]
pub struct CycleData {
    pub buckets: Vec<BucketSeries>,
    pub users: Vec<UserSeries>,
}

struct Gauges {
    bucket_num_objects: GaugeVec,
    bucket_size_kb: GaugeVec,
    bucket_num_shards: GaugeVec,
    user_num_objects: GaugeVec,
    user_size_kb: GaugeVec,
    quota_user_enabled: GaugeVec,
    quota_user_max_size_kb: GaugeVec,
    quota_user_max_objects: GaugeVec,
    quota_bucket_enabled: GaugeVec,
    quota_bucket_max_size_kb: GaugeVec,
    quota_bucket_max_objects: GaugeVec,
}

impl Gauges {
    fn register(registry: &Registry) -> prometheus::Result<Self> {
        let bucket = |name: &str, help: &str| gauge(registry, name, help, &["bucket", "owner"]);
        let owner = |name: &str, help: &str| gauge(registry, name, help, &["owner"]);

        Ok(Self {
            bucket_num_objects: bucket("bucket_num_objects", "Ceph RadosGW bucket num objects")?,
            bucket_size_kb: bucket("bucket_size_kb", "Ceph RadosGW bucket size kb")?,
            bucket_num_shards: bucket("bucket_num_shards", "Ceph RadosGW bucket num shards")?,
            user_num_objects: owner("user_num_objects", "Ceph RadosGW user num objects")?,
            user_size_kb: owner("user_size_kb", "Ceph RadosGW user size kb")?,
            quota_user_enabled: owner("quota_user_enabled", "Ceph RadosGW user quota enabled")?,
            quota_user_max_size_kb: owner(
                "quota_user_max_size_kb",
                "Ceph RadosGW user quota max size kb",
            )?,
            quota_user_max_objects: owner(
                "quota_user_max_objects",
                "Ceph RadosGW user quota max objects",
            )?,
            quota_bucket_enabled: owner("quota_bucket_enabled", "Ceph RadosGW bucket quota enabled")?,
            quota_bucket_max_size_kb: owner(
                "quota_bucket_max_size_kb",
                "Ceph RadosGW bucket quota max size kb",
            )?,
            quota_bucket_max_objects: owner(
                "quota_bucket_max_objects",
                "Ceph RadosGW bucket quota max objects",
            )?,
        })
    }
}

fn gauge(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> prometheus::Result<GaugeVec> {
    let vec = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn flag(enabled: bool) -> f64 {
    if enabled { 1.0 } else { 0.0 }
}

/// One complete, immutable set of series.
#[derive(Debug)]
pub struct MetricsSnapshot {
    registry: Registry,
    collected_at: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    /// The snapshot served before the first cycle completes.
    pub fn empty() -> Self {
        Self {
            registry: Registry::new(),
            collected_at: None,
        }
    }

    /// Build a snapshot from one cycle's results.
    pub fn build(data: &CycleData, collected_at: DateTime<Utc>) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let gauges = Gauges::register(&registry)?;

        for b in &data.buckets {
            let labels = [b.bucket.as_str(), b.owner.as_str()];
            gauges
                .bucket_num_objects
                .with_label_values(&labels)
                .set(b.num_objects as f64);
            gauges
                .bucket_size_kb
                .with_label_values(&labels)
                .set(b.size_kb_actual as f64);
            gauges
                .bucket_num_shards
                .with_label_values(&labels)
                .set(b.num_shards as f64);
        }

        for u in &data.users {
            let labels = [u.owner.as_str()];
            if let Some(stats) = &u.stats {
                gauges
                    .user_num_objects
                    .with_label_values(&labels)
                    .set(stats.num_objects as f64);
                gauges
                    .user_size_kb
                    .with_label_values(&labels)
                    .set(stats.size_kb_actual as f64);
            }
            if let Some(quota) = &u.user_quota {
                gauges.quota_user_enabled.with_label_values(&labels).set(flag(quota.enabled));
                gauges
                    .quota_user_max_size_kb
                    .with_label_values(&labels)
                    .set(quota.published_max_size_kb() as f64);
                gauges
                    .quota_user_max_objects
                    .with_label_values(&labels)
                    .set(quota.max_objects as f64);
            }
            if let Some(quota) = &u.bucket_quota {
                gauges.quota_bucket_enabled.with_label_values(&labels).set(flag(quota.enabled));
                gauges
                    .quota_bucket_max_size_kb
                    .with_label_values(&labels)
                    .set(quota.published_max_size_kb() as f64);
                gauges
                    .quota_bucket_max_objects
                    .with_label_values(&labels)
                    .set(quota.max_objects as f64);
            }
        }

        Ok(Self {
            registry,
            collected_at: Some(collected_at),
        })
    }

    pub fn collected_at(&self) -> Option<DateTime<Utc>> {
        self.collected_at
    }

    /// Number of labeled series across all gauges.
    pub fn series_count(&self) -> usize {
        self.registry
            .gather()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }

    /// Value of the series `name` (without namespace) carrying exactly `labels`.
    #[cfg(test)]
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let full_name = format!("{NAMESPACE}_{name}");
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == full_name)
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(k, v)| {
                        pairs
                            .iter()
                            .any(|pair| pair.get_name() == *k && pair.get_value() == *v)
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Render in the Prometheus text exposition format.
    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Shared handle to the current snapshot. Cloning shares the same slot.
#[derive(Clone)]
pub struct SnapshotRegistry {
    current: Arc<ArcSwap<MetricsSnapshot>>,
}

impl Default for SnapshotRegistry {
    fn default() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(MetricsSnapshot::empty())),
        }
    }
}

impl SnapshotRegistry {
    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: MetricsSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    pub fn current(&self) -> Arc<MetricsSnapshot> {
        self.current.load_full()
    }

    /// True once at least one cycle has been published.
    pub fn is_ready(&self) -> bool {
        self.current.load().collected_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(name: &str, owner: &str, objects: i64, kb: i64, shards: i64) -> BucketSeries {
        BucketSeries {
            bucket: name.into(),
            owner: owner.into(),
            num_objects: objects,
            size_kb_actual: kb,
            num_shards: shards,
        }
    }

    #[test]
    fn quota_series_follow_unlimited_convention() {
        let data = CycleData {
            buckets: vec![],
            users: vec![UserSeries {
                owner: "alice".into(),
                stats: None,
                user_quota: Some(Quota {
                    enabled: true,
                    max_size_kb: 0,
                    max_objects: 5,
                }),
                bucket_quota: Some(Quota {
                    enabled: false,
                    max_size_kb: 4096,
                    max_objects: -1,
                }),
            }],
        };
        let snap = MetricsSnapshot::build(&data, Utc::now()).unwrap();
        let owner = [("owner", "alice")];

        assert_eq!(snap.value("quota_user_enabled", &owner), Some(1.0));
        assert_eq!(snap.value("quota_user_max_size_kb", &owner), Some(-1.0));
        assert_eq!(snap.value("quota_user_max_objects", &owner), Some(5.0));
        assert_eq!(snap.value("quota_bucket_enabled", &owner), Some(0.0));
        assert_eq!(snap.value("quota_bucket_max_size_kb", &owner), Some(4096.0));
        assert_eq!(snap.value("quota_bucket_max_objects", &owner), Some(-1.0));
        assert_eq!(snap.value("user_num_objects", &owner), None);
    }

    #[test]
    fn publish_replaces_previous_series() {
        let registry = SnapshotRegistry::default();
        assert!(!registry.is_ready());
        assert_eq!(registry.current().series_count(), 0);

        let first = CycleData {
            buckets: vec![bucket("b1", "alice", 1, 1, 1), bucket("b2", "bob", 2, 2, 1)],
            users: vec![],
        };
        registry.publish(MetricsSnapshot::build(&first, Utc::now()).unwrap());
        let held = registry.current();

        let second = CycleData {
            buckets: vec![bucket("b1", "alice", 3, 3, 1)],
            users: vec![],
        };
        registry.publish(MetricsSnapshot::build(&second, Utc::now()).unwrap());

        let now = registry.current();
        let b2 = [("bucket", "b2"), ("owner", "bob")];
        assert!(registry.is_ready());
        assert_eq!(now.value("bucket_num_objects", &b2), None);
        assert_eq!(
            now.value("bucket_num_objects", &[("bucket", "b1"), ("owner", "alice")]),
            Some(3.0)
        );
        // A reader that loaded before the swap keeps a complete old view.
        assert_eq!(held.value("bucket_num_objects", &b2), Some(2.0));
        assert_eq!(held.series_count(), 6);
    }

    #[test]
    fn encode_uses_namespaced_names() {
        let data = CycleData {
            buckets: vec![bucket("b1", "alice", 10, 500, 2)],
            users: vec![],
        };
        let snap = MetricsSnapshot::build(&data, Utc::now()).unwrap();
        let text = String::from_utf8(snap.encode().unwrap()).unwrap();
        assert!(text.contains("# TYPE ceph_radosgw_bucket_num_objects gauge"));
        assert!(text.contains(r#"ceph_radosgw_bucket_size_kb{bucket="b1",owner="alice"} 500"#));
    }
}
