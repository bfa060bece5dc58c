//! User usage as reported by `GET /admin/user?uid={id}&stats=True`.

use super::bucket::UsageStats;
use serde::Deserialize;

/// User identifiers returned by `GET /admin/metadata/user`.
pub type UserList = Vec<String>;

/// Aggregate usage across all buckets owned by one user.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserDetail {
    #[serde(default)]
    pub stats: UsageStats,
}
