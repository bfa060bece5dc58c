//! Signed HTTP client for the RadosGW admin API.
//!
//! Network-level failures (connect errors, timeouts, truncated bodies) are
//! retried forever with a fixed backoff: the exporter is a low-frequency
//! background poller and a gateway restart should not take it down. A non-2xx
//! status is returned to the caller without retrying.

use crate::services::signer::Signer;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{StatusCode, Url, header::AUTHORIZATION};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin API returned {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("empty response for {entity}")]
    EmptyResponse { entity: String },
    #[error("failed to decode {entity}: {source}")]
    Decode {
        entity: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidUrl { endpoint: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl AdminError {
    /// Fatal errors end the process; the rest only cost one entity or one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdminError::Status { .. } | AdminError::InvalidUrl { .. } | AdminError::Client(_)
        )
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Timing knobs for admin calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Upper bound on a single attempt, body included.
    pub timeout: Duration,
    /// Fixed delay between a failed attempt and the next one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    signer: Signer,
    retry: RetryPolicy,
}

impl AdminClient {
    pub fn new(signer: Signer, skip_tls_verification: bool, retry: RetryPolicy) -> AdminResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(retry.timeout)
            .danger_accept_invalid_certs(skip_tls_verification)
            .build()?;

        Ok(Self { http, signer, retry })
    }

    /// GET `url` and return the response body.
    ///
    /// Only returns once the gateway answered: either the 2xx body or a
    /// [`AdminError::Status`] error.
    pub async fn call(&self, url: &Url) -> AdminResult<Bytes> {
        let mut attempt: u64 = 1;
        loop {
            match self.attempt(url).await {
                Ok((status, body)) if status.is_success() => {
                    debug!(%url, %status, attempt, bytes = body.len(), "admin call completed");
                    return Ok(body);
                }
                Ok((status, _)) => {
                    return Err(AdminError::Status {
                        status,
                        url: url.to_string(),
                    });
                }
                Err(err) if err.is_timeout() => {
                    warn!(%url, attempt, "admin request timed out, retrying");
                }
                Err(err) => {
                    warn!(%url, attempt, error = %err, "network error calling admin API, retrying");
                }
            }
            sleep(self.retry.backoff).await;
            attempt += 1;
        }
    }

    /// One signed request. Signed per attempt so retries never carry a stale date.
    async fn attempt(&self, url: &Url) -> Result<(StatusCode, Bytes), reqwest::Error> {
        let signed = self.signer.sign_get(url, Utc::now());
        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok((status, Bytes::new()));
        }
        let body = response.bytes().await?;
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{signer::Credentials, testing::FakeGateway};

    fn client(timeout_ms: u64) -> AdminClient {
        let signer = Signer::for_radosgw(Credentials {
            access_key: "admin".into(),
            secret_key: "secret".into(),
        });
        AdminClient::new(
            signer,
            false,
            RetryPolicy {
                timeout: Duration::from_millis(timeout_ms),
                backoff: Duration::from_millis(10),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn returns_body_and_signs_request() {
        let gateway = FakeGateway::default();
        gateway.respond("/admin/bucket", r#"["b1"]"#);
        let base = gateway.start().await;

        let url = Url::parse(&format!("{base}/admin/bucket")).unwrap();
        let body = client(1_000).call(&url).await.unwrap();

        assert_eq!(&body[..], br#"["b1"]"#);
        let auth = gateway.last_authorization().unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=admin/"));
        assert!(auth.contains("/us-east-1/s3/aws4_request"));
    }

    #[tokio::test]
    async fn timeout_then_success_matches_first_attempt_success() {
        let gateway = FakeGateway::default();
        gateway.respond("/admin/bucket", r#"["b1","b2"]"#);
        gateway.respond("/admin/metadata/user", r#"["b1","b2"]"#);
        gateway.stall_first("/admin/bucket", 1, Duration::from_millis(500));
        let base = gateway.start().await;
        let client = client(100);

        let retried = client
            .call(&Url::parse(&format!("{base}/admin/bucket")).unwrap())
            .await
            .unwrap();
        let direct = client
            .call(&Url::parse(&format!("{base}/admin/metadata/user")).unwrap())
            .await
            .unwrap();

        assert_eq!(retried, direct);
        assert_eq!(gateway.hits("/admin/bucket"), 2);
        assert_eq!(gateway.hits("/admin/metadata/user"), 1);
    }

    #[tokio::test]
    async fn refused_connection_is_retried_until_gateway_comes_up() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let url = Url::parse(&format!("http://{addr}/admin/bucket")).unwrap();
        let pending = tokio::spawn(async move { client(1_000).call(&url).await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!pending.is_finished());

        let gateway = FakeGateway::default();
        gateway.respond("/admin/bucket", r#"["x"]"#);
        gateway.serve(tokio::net::TcpListener::bind(addr).await.unwrap());

        let body = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .expect("call should finish once the gateway listens")
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], br#"["x"]"#);
        assert_eq!(gateway.hits("/admin/bucket"), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_not_retried() {
        let gateway = FakeGateway::default();
        gateway.respond_status("/admin/bucket", StatusCode::SERVICE_UNAVAILABLE);
        let base = gateway.start().await;

        let err = client(1_000)
            .call(&Url::parse(&format!("{base}/admin/bucket")).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AdminError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(err.is_fatal());
        assert_eq!(gateway.hits("/admin/bucket"), 1);
    }

    #[tokio::test]
    async fn empty_body_is_returned_to_caller() {
        let gateway = FakeGateway::default();
        gateway.respond("/admin/bucket", "");
        let base = gateway.start().await;

        let body = client(1_000)
            .call(&Url::parse(&format!("{base}/admin/bucket")).unwrap())
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
