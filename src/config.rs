use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, time::Duration};

const DEFAULT_PORT: u16 = 9242;
const DEFAULT_INTERVAL_SECS: u64 = 120;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 2;

/// Centralized exporter configuration.
/// Combines environment variables and CLI arguments, CLI taking precedence.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Gateway base URL without a trailing slash.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub skip_ssl_verification: bool,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub retry_backoff: Duration,
    pub fetch_concurrency: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Prometheus exporter for Ceph RadosGW usage and quotas")]
pub struct Args {
    /// RadosGW endpoint, e.g. http://rgw.local:7480 (overrides RADOSGW_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Host to bind the exporter to (overrides EXPORTER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind the exporter to (overrides EXPORTER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Admin user access key (overrides ACCESS_KEY)
    #[arg(long)]
    pub access_key: Option<String>,

    /// Admin user secret key (overrides SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Skip TLS certificate verification (or SKIP_SSL_VERIFICATION=true)
    #[arg(long)]
    pub skip_ssl_verification: bool,

    /// Seconds between collection cycles (overrides COLLECT_INTERVAL_SECS)
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Per-attempt admin API timeout in seconds (overrides REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Delay before retrying a failed admin API call (overrides RETRY_BACKOFF_SECS)
    #[arg(long)]
    pub retry_backoff_secs: Option<u64>,

    /// Number of per-entity admin calls in flight (overrides FETCH_CONCURRENCY)
    #[arg(long)]
    pub fetch_concurrency: Option<usize>,
}

impl AppConfig {
    /// Parse CLI args, falling back to the process environment.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_sources(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge parsed args with an environment lookup and validate the result.
    ///
    /// Empty environment values count as unset.
    pub fn from_sources(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = match args.endpoint.or_else(|| env("RADOSGW_ENDPOINT")) {
            Some(endpoint) => validate_endpoint(&endpoint)?,
            None => bail!("RadosGW endpoint is not provided. Set environment variable RADOSGW_ENDPOINT."),
        };

        let port = match args.port {
            Some(port) => port,
            None => match env("EXPORTER_PORT") {
                Some(value) => value
                    .trim()
                    .parse::<u16>()
                    .with_context(|| format!("Configured port is not a valid number: {value}"))?,
                None => DEFAULT_PORT,
            },
        };

        let Some(access_key) = args.access_key.or_else(|| env("ACCESS_KEY")) else {
            bail!("RadosGW credentials are not provided. Set environment variable ACCESS_KEY.");
        };
        let Some(secret_key) = args.secret_key.or_else(|| env("SECRET_KEY")) else {
            bail!("RadosGW credentials are not provided. Set environment variable SECRET_KEY.");
        };

        let skip_ssl_verification = args.skip_ssl_verification
            || env("SKIP_SSL_VERIFICATION").is_some_and(|v| parse_bool(&v));

        let interval = seconds(args.interval_secs, &env, "COLLECT_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        let request_timeout = seconds(
            args.request_timeout_secs,
            &env,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let retry_backoff = seconds(
            args.retry_backoff_secs,
            &env,
            "RETRY_BACKOFF_SECS",
            DEFAULT_RETRY_BACKOFF_SECS,
        )?;
        if interval.is_zero() || request_timeout.is_zero() || retry_backoff.is_zero() {
            bail!("collection interval, request timeout and retry backoff must be greater than zero");
        }

        let fetch_concurrency = match args.fetch_concurrency {
            Some(n) => n,
            None => match env("FETCH_CONCURRENCY") {
                Some(value) => value
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("parsing FETCH_CONCURRENCY value `{value}`"))?,
                None => 1,
            },
        }
        .max(1);

        Ok(Self {
            host: args
                .host
                .or_else(|| env("EXPORTER_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            endpoint,
            access_key,
            secret_key,
            skip_ssl_verification,
            interval,
            request_timeout,
            retry_backoff,
            fetch_concurrency,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("skip_ssl_verification", &self.skip_ssl_verification)
            .field("interval", &self.interval)
            .field("request_timeout", &self.request_timeout)
            .field("retry_backoff", &self.retry_backoff)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .finish()
    }
}

/// Endpoint must be `http://` or `https://` followed by a host.
fn validate_endpoint(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));

    match rest.and_then(|r| r.chars().next()) {
        Some(c) if c.is_ascii_alphanumeric() || c == '.' => {}
        _ => bail!("RadosGW endpoint URL must start with http:// or https://"),
    }

    reqwest::Url::parse(trimmed)
        .with_context(|| format!("RadosGW endpoint `{trimmed}` is not a valid URL"))?;

    Ok(trimmed.trim_end_matches('/').to_string())
}

fn seconds(
    arg: Option<u64>,
    env: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<Duration> {
    let secs = match arg {
        Some(secs) => secs,
        None => match env(name) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("parsing {name} value `{value}`"))?,
            None => default,
        },
    };
    Ok(Duration::from_secs(secs))
}

/// Accepts the usual spellings of a boolean; anything else is false.
fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "t" | "T" | "true" | "TRUE" | "True")
}
