//! Typed reads against the RadosGW admin API.
//!
//! Each fetcher builds the admin URL, runs it through [`AdminClient`] and
//! decodes the JSON body. An empty body is reported as
//! [`AdminError::EmptyResponse`]; a legitimately empty list arrives as `[]`.

use crate::{
    models::{
        bucket::{BucketDetail, BucketList},
        quota::{Quota, QuotaKind},
        user::{UserDetail, UserList},
    },
    services::admin_client::{AdminClient, AdminError, AdminResult},
};
use reqwest::Url;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct RadosGwApi {
    client: AdminClient,
    endpoint: Url,
}

impl RadosGwApi {
    pub fn new(endpoint: &str, client: AdminClient) -> AdminResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|err| AdminError::InvalidUrl {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(AdminError::InvalidUrl {
                endpoint: endpoint.to_string(),
                reason: "not a base URL".into(),
            });
        }
        Ok(Self { client, endpoint })
    }

    /// `GET /admin/metadata/user`
    pub async fn list_users(&self) -> AdminResult<UserList> {
        let url = self.admin_url("/admin/metadata/user", &[]);
        self.fetch("user list", &url).await
    }

    /// `GET /admin/bucket`
    pub async fn list_buckets(&self) -> AdminResult<BucketList> {
        let url = self.admin_url("/admin/bucket", &[]);
        self.fetch("bucket list", &url).await
    }

    /// `GET /admin/bucket?bucket={bucket}`
    pub async fn bucket_detail(&self, bucket: &str) -> AdminResult<BucketDetail> {
        let url = self.admin_url("/admin/bucket", &[("bucket", Some(bucket))]);
        self.fetch(&format!("bucket `{bucket}` stats"), &url).await
    }

    /// `GET /admin/user?uid={uid}&stats=True`
    pub async fn user_detail(&self, uid: &str) -> AdminResult<UserDetail> {
        let url = self.admin_url("/admin/user", &[("uid", Some(uid)), ("stats", Some("True"))]);
        self.fetch(&format!("user `{uid}` stats"), &url).await
    }

    /// `GET /admin/user?quota&quota-type=user&uid={uid}`
    pub async fn user_quota(&self, uid: &str) -> AdminResult<Quota> {
        self.quota(QuotaKind::User, uid).await
    }

    /// `GET /admin/user?quota&quota-type=bucket&uid={uid}`: the default
    /// quota applied to each bucket owned by `uid`.
    pub async fn bucket_quota(&self, uid: &str) -> AdminResult<Quota> {
        self.quota(QuotaKind::Bucket, uid).await
    }

    async fn quota(&self, kind: QuotaKind, uid: &str) -> AdminResult<Quota> {
        let url = self.admin_url(
            "/admin/user",
            &[
                ("quota", None),
                ("quota-type", Some(kind.as_query())),
                ("uid", Some(uid)),
            ],
        );
        self.fetch(&format!("{} quota for `{uid}`", kind.as_query()), &url)
            .await
    }

    /// Endpoint + `path` + form-encoded `params`; a `None` value renders as a bare key.
    fn admin_url(&self, path: &str, params: &[(&str, Option<&str>)]) -> Url {
        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}{path}"));
        url.set_query(None);
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                match value {
                    Some(value) => pairs.append_pair(key, value),
                    None => pairs.append_key_only(key),
                };
            }
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(&self, entity: &str, url: &Url) -> AdminResult<T> {
        let body = self.client.call(url).await?;
        decode(entity, &body)
    }
}

fn decode<T: DeserializeOwned>(entity: &str, body: &[u8]) -> AdminResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AdminError::EmptyResponse {
            entity: entity.to_string(),
        });
    }
    serde_json::from_slice(body).map_err(|source| AdminError::Decode {
        entity: entity.to_string(),
        source,
    })
}
