use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::enrich::DEFAULT_BIO_MAX_LEN;
use crate::retry::RetryPolicy;

/// Run configuration. `Default` reproduces the reference behaviour: sequential,
/// 100-account pages, 50ms between requests, top 30, no retries.
#[derive(Debug, Clone)]
pub struct OrbitConfig {
    pub api_base: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub top_n: usize,
    /// Minimum spacing between any two outbound requests. Zero disables pacing.
    pub pacing: Duration,
    /// Follow lists / profiles fetched at the same time.
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub bio_max_len: usize,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            api_base: bsky_client::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            page_size: bsky_client::MAX_PAGE_SIZE,
            top_n: 30,
            pacing: Duration::from_millis(50),
            concurrency: 1,
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            bio_max_len: DEFAULT_BIO_MAX_LEN,
        }
    }
}

impl OrbitConfig {
    /// Defaults overridden by environment variables (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            api_base: std::env::var("BSKY_API_BASE").unwrap_or(defaults.api_base),
            request_timeout: env_parse("ORBIT_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            page_size: env_parse("ORBIT_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            top_n: env_parse("ORBIT_TOP_N")?.unwrap_or(defaults.top_n),
            pacing: env_parse("ORBIT_PACING_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing),
            concurrency: env_parse("ORBIT_CONCURRENCY")?.unwrap_or(defaults.concurrency),
            max_retries: env_parse("ORBIT_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            retry_backoff: env_parse("ORBIT_RETRY_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            bio_max_len: env_parse("ORBIT_BIO_MAX_LEN")?.unwrap_or(defaults.bio_max_len),
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > bsky_client::MAX_PAGE_SIZE {
            bail!(
                "page size must be between 1 and {}, got {}",
                bsky_client::MAX_PAGE_SIZE,
                self.page_size
            );
        }
        if self.top_n == 0 {
            bail!("top N must be at least 1");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.bio_max_len < 4 {
            bail!("bio length must be at least 4, got {}", self.bio_max_len);
        }
        if self.api_base.trim().is_empty() {
            bail!("API base URL must not be empty");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff)
    }

    pub fn log(&self) {
        info!(
            api_base = self.api_base.as_str(),
            page_size = self.page_size,
            top_n = self.top_n,
            pacing_ms = self.pacing.as_millis() as u64,
            concurrency = self.concurrency,
            max_retries = self.max_retries,
            "Configuration loaded"
        );
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        _ => Ok(None),
    }
}
