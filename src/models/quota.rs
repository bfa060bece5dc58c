//! Quota settings returned by `GET /admin/user?quota&quota-type={user|bucket}&uid={id}`.

use serde::Deserialize;

/// Which quota a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuotaKind {
    /// Limits on everything a user owns.
    User,
    /// Default limits applied to each bucket of a user.
    Bucket,
}

impl QuotaKind {
    /// Value of the `quota-type` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            QuotaKind::User => "user",
            QuotaKind::Bucket => "bucket",
        }
    }
}

/// A quota as configured on the gateway.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quota {
    #[serde(default)]
    pub enabled: bool,

    /// Size limit in storage-kilobytes. Zero means no limit is configured.
    #[serde(default)]
    pub max_size_kb: i64,

    #[serde(default)]
    pub max_objects: i64,
}

impl Quota {
    /// Size limit as published: zero becomes `-1` so dashboards can tell
    /// "unlimited" apart from a limit of zero.
    pub fn published_max_size_kb(&self) -> i64 {
        if self.max_size_kb == 0 {
            -1
        } else {
            self.max_size_kb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_size_is_published_as_unlimited() {
        let quota = Quota {
            enabled: true,
            max_size_kb: 0,
            max_objects: 10,
        };
        assert_eq!(quota.published_max_size_kb(), -1);
    }

    #[test]
    fn nonzero_max_size_passes_through() {
        for value in [1, 1024, -1, i64::MAX] {
            let quota = Quota {
                max_size_kb: value,
                ..Quota::default()
            };
            assert_eq!(quota.published_max_size_kb(), value);
        }
    }

    #[test]
    fn decodes_gateway_payload() {
        let body = r#"{"enabled":true,"check_on_raw":false,"max_size":1048576,"max_size_kb":1024,"max_objects":-1}"#;
        let quota: Quota = serde_json::from_str(body).unwrap();
        assert!(quota.enabled);
        assert_eq!(quota.max_size_kb, 1024);
        assert_eq!(quota.max_objects, -1);
    }
}
