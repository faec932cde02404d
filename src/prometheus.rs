//! Client for the monitoring endpoint's alert API
//!
//! Speaks the Prometheus `/api/v1/alerts` response format. The `AlertFetcher`
//! trait is the seam the poll tasks and command handlers work against, so
//! tests can substitute a fake without a running endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use crate::Alert;
use crate::config::TargetConfig;

/// Fetches the current firing alerts for one target.
///
/// Errors are opaque to callers; a failed fetch is logged and retried on the
/// next tick, never branched on.
#[async_trait]
pub trait AlertFetcher: Send + Sync {
    async fn fetch_alerts(&self) -> Result<Vec<Alert>>;
}

/// Builds a fetcher from a target config.
///
/// The scrape manager and the command handlers both construct their clients
/// through this, which is what lets tests inject fakes.
pub type FetcherFactory = Arc<dyn Fn(&TargetConfig) -> Arc<dyn AlertFetcher> + Send + Sync>;

pub fn default_fetcher_factory() -> FetcherFactory {
    Arc::new(|config| Arc::new(PrometheusClient::from_target(config)) as Arc<dyn AlertFetcher>)
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    #[allow(dead_code)]
    status: String,

    data: ApiData,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(default)]
    alerts: Vec<Alert>,
}

/// HTTP client for one alert endpoint.
pub struct PrometheusClient {
    /// Reused across requests for connection pooling
    client: reqwest::Client,
    endpoint: String,
    basic_auth: Option<(String, String)>,
}

impl PrometheusClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint: endpoint.into(),
            basic_auth: None,
        }
    }

    pub fn with_basic_auth(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut client = Self::new(endpoint);
        client.basic_auth = Some((username.into(), password.into()));
        client
    }

    pub fn from_target(config: &TargetConfig) -> Self {
        match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                Self::with_basic_auth(&config.endpoint, username, password)
            }
            _ => Self::new(&config.endpoint),
        }
    }
}

#[async_trait]
impl AlertFetcher for PrometheusClient {
    async fn fetch_alerts(&self) -> Result<Vec<Alert>> {
        trace!("requesting alerts from {}", self.endpoint);

        let mut request = self.client.get(&self.endpoint);

        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .context("failed to send HTTP request")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let body: ApiResponse = response
            .json()
            .await
            .context("failed to parse alerts response")?;

        trace!("fetched {} alerts", body.data.alerts.len());

        Ok(body.data.alerts)
    }
}

/// Drop every alert whose `alertname` label appears in the inhibition list.
///
/// Alerts without an `alertname` label cannot match an inhibition and pass
/// through untouched.
pub fn filter_alerts(alerts: Vec<Alert>, inhibitions: &[String]) -> Vec<Alert> {
    alerts
        .into_iter()
        .filter(|alert| match alert.name() {
            Some(name) => !inhibitions.iter().any(|inhibited| inhibited == name),
            None => true,
        })
        .collect()
}
