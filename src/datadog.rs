//! DataDog gauge submission

use anyhow::{Context, Result};
use serde_json::json;
use std::fmt;

pub const API_KEY_ENV: &str = "DATADOG_API_KEY";
pub const MISSING_API_KEY_MESSAGE: &str =
    "Must specify DataDog API key with env var DATADOG_API_KEY";
pub const DEFAULT_API_HOST: &str = "https://api.datadoghq.com";

/// One gauge sample
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub metric: String,
    pub value: f64,
    pub tags: Vec<String>,
}

/// Client for the DataDog v1 series API
#[derive(Clone)]
pub struct DatadogClient {
    api_key: String,
    api_host: String,
    http: reqwest::Client,
}

impl fmt::Debug for DatadogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatadogClient")
            .field("api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .finish_non_exhaustive()
    }
}

impl DatadogClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Build a client from `DATADOG_API_KEY`, or `None` if it is unset or empty.
    pub fn from_env() -> Option<Self> {
        api_key_from(std::env::var(API_KEY_ENV).ok()).map(Self::new)
    }

    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    pub fn series_url(&self) -> String {
        format!("{}/api/v1/series", self.api_host.trim_end_matches('/'))
    }

    /// Submit gauges in a single series request
    pub async fn send(&self, gauges: &[Gauge]) -> Result<()> {
        if gauges.is_empty() {
            return Ok(());
        }

        let payload = series_payload(gauges, chrono::Utc::now().timestamp());

        let response = self
            .http
            .post(self.series_url())
            .header("DD-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.api_host))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("DataDog series submission failed: {} - {}", status, text);
        }

        Ok(())
    }
}

/// Treat an empty key the same as a missing one
pub fn api_key_from(value: Option<String>) -> Option<String> {
    value.filter(|key| !key.is_empty())
}

/// Build the JSON body for `POST /api/v1/series`
pub fn series_payload(gauges: &[Gauge], timestamp: i64) -> serde_json::Value {
    let series: Vec<_> = gauges
        .iter()
        .map(|gauge| {
            json!({
                "metric": gauge.metric,
                "points": [[timestamp, gauge.value]],
                "type": "gauge",
                "tags": gauge.tags,
            })
        })
        .collect();

    json!({ "series": series })
}
