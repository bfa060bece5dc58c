//! Bucket usage as reported by `GET /admin/bucket?bucket={name}`.

use serde::Deserialize;

/// Bucket identifiers returned by `GET /admin/bucket`.
pub type BucketList = Vec<String>;

/// Detail for a single bucket.
///
/// The gateway reports usage per internal storage category. Only
/// `rgw.main` carries user-visible objects; a freshly created bucket has no
/// categories at all, which decodes as zero usage.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BucketDetail {
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,

    /// Owning user id.
    #[serde(default)]
    pub owner: String,

    /// Number of index shards.
    #[serde(default)]
    pub num_shards: i64,

    /// Usage broken down by storage category.
    #[serde(default)]
    pub usage: BucketUsage,
}

/// Usage keyed by storage category label.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BucketUsage {
    #[serde(rename = "rgw.main", default)]
    pub main: UsageStats,

    #[serde(rename = "rgw.none", default)]
    pub none: UsageStats,

    #[serde(rename = "rgw.multimeta", default)]
    pub multimeta: UsageStats,
}

/// Object count and size figures, in storage-kilobytes.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UsageStats {
    #[serde(default)]
    pub size_kb: i64,

    #[serde(default)]
    pub size_kb_actual: i64,

    #[serde(default)]
    pub num_objects: i64,
}

impl BucketDetail {
    /// Usage of the `rgw.main` category, the only one published.
    pub fn main_usage(&self) -> UsageStats {
        self.usage.main
    }
}
