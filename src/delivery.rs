//! Chat delivery of filtered alerts
//!
//! The `AlertSink` trait is the boundary the correlator hands filtered
//! alerts to; `DiscordSink` implements it against the Discord REST API,
//! one rich embed per alert.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use crate::Alert;

/// Receives the filtered alert list for a delivery channel.
///
/// Fire-and-forget from the correlator's perspective: failures are logged
/// by the caller and never retried.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, channel_id: &str, target_name: &str, alerts: &[Alert]) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Embed accent color for an alert severity.
pub fn severity_color(severity: Option<&str>) -> u32 {
    match severity {
        Some("warning") => 0xffaa00,
        Some("critical") => 0xff0000,
        _ => 0xffffff,
    }
}

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Posts alert embeds into guild text channels via the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordSink {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordSink {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DISCORD_API_BASE)
    }

    /// Tests point this at a mock server.
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn build_alert_embed(alert: &Alert, target_name: &str) -> Embed {
        // Sorted so the rendered field order is stable
        let fields = alert
            .labels
            .iter()
            .collect::<std::collections::BTreeMap<_, _>>()
            .into_iter()
            .map(|(name, value)| EmbedField {
                name: name.clone(),
                value: value.clone(),
                inline: false,
            })
            .collect();

        Embed {
            title: Some(alert.name().unwrap_or("(unnamed alert)").to_string()),
            description: alert.annotations.get("description").cloned(),
            url: alert.annotations.get("runbook_url").cloned(),
            color: Some(severity_color(alert.severity())),
            fields,
            footer: Some(EmbedFooter {
                text: format!("target: {target_name}"),
            }),
            timestamp: alert.active_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[async_trait]
impl AlertSink for DiscordSink {
    #[instrument(skip(self, alerts), fields(count = alerts.len()))]
    async fn deliver(&self, channel_id: &str, target_name: &str, alerts: &[Alert]) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        // One message per alert, so each gets its own embed card
        for alert in alerts {
            let message = Message {
                content: None,
                embeds: vec![Self::build_alert_embed(alert, target_name)],
            };

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bot {}", self.token))
                .json(&message)
                .send()
                .await
                .context("failed to send chat message")?;

            if !response.status().is_success() {
                anyhow::bail!("chat API error: {}", response.status());
            }
        }

        info!("delivered {} alerts to channel {channel_id}", alerts.len());
        Ok(())
    }
}
