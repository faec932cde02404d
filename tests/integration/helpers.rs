//! Helper functions for integration tests

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use alert_relay::Alert;
use alert_relay::config::{GuildConfig, TargetConfig};
use alert_relay::delivery::AlertSink;
use alert_relay::prometheus::{AlertFetcher, FetcherFactory};
use alert_relay::store::{ConfigStore, MemoryStore};

pub fn create_test_target(name: &str, interval: u64, channel_id: &str) -> TargetConfig {
    TargetConfig {
        name: name.to_string(),
        endpoint: "http://localhost:9090/api/v1/alerts".to_string(),
        username: None,
        password: None,
        interval,
        channel_id: channel_id.to_string(),
        inhibited_alerts: vec![],
    }
}

pub fn create_test_alert(name: &str) -> Alert {
    Alert {
        labels: HashMap::from([
            ("alertname".to_string(), name.to_string()),
            ("severity".to_string(), "warning".to_string()),
        ]),
        ..Alert::default()
    }
}

/// Prometheus alerts API response wrapping the given alerts
pub fn alerts_response_json(alert_names: &[&str]) -> serde_json::Value {
    let alerts: Vec<_> = alert_names
        .iter()
        .map(|name| {
            serde_json::json!({
                "labels": { "alertname": name, "severity": "warning" },
                "annotations": {},
                "state": "firing"
            })
        })
        .collect();

    serde_json::json!({ "status": "success", "data": { "alerts": alerts } })
}

pub async fn seed_store(store: &dyn ConfigStore, guild_id: &str, targets: Vec<TargetConfig>) {
    let mut guild = GuildConfig::new(guild_id);
    guild.targets = targets;
    store.set_guild_config(guild).await.unwrap();
}

pub fn new_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Sink recording (channel_id, alert names) per delivery
#[derive(Default)]
pub struct RecordingSink {
    pub deliveries: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingSink {
    pub async fn delivered_names(&self) -> Vec<Vec<String>> {
        self.deliveries
            .lock()
            .await
            .iter()
            .map(|(_, names)| names.clone())
            .collect()
    }

    pub async fn channels(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .await
            .iter()
            .map(|(channel, _)| channel.clone())
            .collect()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn deliver(&self, channel_id: &str, _target_name: &str, alerts: &[Alert]) -> Result<()> {
        let names = alerts
            .iter()
            .map(|alert| alert.name().unwrap_or("(unnamed)").to_string())
            .collect();

        self.deliveries
            .lock()
            .await
            .push((channel_id.to_string(), names));

        Ok(())
    }
}

/// Fetcher returning a fixed alert list on every call
pub struct FixedFetcher {
    pub alerts: Vec<Alert>,
}

#[async_trait]
impl AlertFetcher for FixedFetcher {
    async fn fetch_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.clone())
    }
}

/// Factory handing every task the same fixed alert list
pub fn fixed_fetcher_factory(alerts: Vec<Alert>) -> FetcherFactory {
    Arc::new(move |_| {
        Arc::new(FixedFetcher {
            alerts: alerts.clone(),
        }) as Arc<dyn AlertFetcher>
    })
}
