use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::set_header;
use crate::options::RequestOptions;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server URL including the API version prefix, e.g. `http://localhost:8888/v1`
    pub remote: String,

    /// Headers attached to every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Attach concurrency-control headers by default
    #[serde(default)]
    pub safe: bool,

    /// Retries allowed when the server answers with `Retry-After`
    #[serde(default)]
    pub retry: u32,

    /// Per-request timeout in milliseconds; no timeout when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_bucket() -> String {
    "default".to_string()
}

impl ClientConfig {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            headers: BTreeMap::new(),
            bucket: default_bucket(),
            safe: false,
            retry: 0,
            timeout_ms: None,
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client config {}", path))?;
        let config: ClientConfig =
            serde_json::from_str(&contents).context("Failed to parse client config")?;
        tracing::debug!(remote = %config.remote, "Loaded client config from {}", path);
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Remote without trailing slashes, ready to prefix paths with
    pub fn normalized_remote(&self) -> &str {
        self.remote.trim_end_matches('/')
    }

    /// Client-wide options that per-call options are merged over
    pub fn defaults(&self) -> RequestOptions {
        RequestOptions {
            headers: self.headers.clone(),
            safe: Some(self.safe),
            retry: Some(self.retry),
            bucket: Some(self.bucket.clone()),
            ..Default::default()
        }
    }
}
