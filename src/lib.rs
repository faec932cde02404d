pub mod config;
pub mod delivery;
pub mod handlers;
pub mod prometheus;
pub mod scrape;
pub mod store;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A firing alert as reported by the monitoring endpoint.
///
/// The label and annotation maps are unordered; the well-known labels are
/// `alertname` and `severity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub labels: HashMap<String, String>,

    #[serde(default)]
    pub annotations: HashMap<String, String>,

    /// When the alert started firing.
    #[serde(default, rename = "activeAt")]
    pub active_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub value: String,
}

impl Alert {
    /// The `alertname` label, if present.
    pub fn name(&self) -> Option<&str> {
        self.labels.get("alertname").map(String::as_str)
    }

    /// The `severity` label, if present.
    pub fn severity(&self) -> Option<&str> {
        self.labels.get("severity").map(String::as_str)
    }
}

/// Identity of one poll task: (guild id, target name).
///
/// At most one poll task runs per key at any time; the scrape manager's
/// registry enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub guild_id: String,
    pub target_name: String,
}

impl TaskKey {
    pub fn new(guild_id: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            target_name: target_name.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.target_name)
    }
}

/// One tick's worth of alerts from a single target.
///
/// Produced by a poll task, consumed exactly once by the correlator.
/// Carries only identity alongside the alerts; the correlator re-resolves
/// everything else against the current configuration.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub guild_id: String,
    pub target_name: String,
    pub alerts: Vec<Alert>,
}
