use serde::{Deserialize, Serialize};
use tracing::trace;

/// Top-level file configuration used to seed the store at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub guilds: Option<Vec<GuildConfig>>,
}

/// Everything stored for one guild: its id and its scrape targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfig {
    pub guild_id: String,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl GuildConfig {
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            targets: Vec::new(),
        }
    }

    pub fn find_target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|target| target.name == name)
    }

    /// Mutable lookup into the backing vector, so edits land on the stored
    /// element rather than a copy.
    pub fn find_target_mut(&mut self, name: &str) -> Option<&mut TargetConfig> {
        self.targets.iter_mut().find(|target| target.name == name)
    }
}

/// One monitoring target: the endpoint to poll, how often, and where the
/// resulting alerts go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Unique within a guild.
    pub name: String,

    /// Alert API endpoint, e.g. `https://prometheus.example.com/api/v1/alerts`.
    pub endpoint: String,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Poll interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Chat channel that receives the filtered alerts.
    pub channel_id: String,

    /// Alert names suppressed for this target.
    #[serde(default)]
    pub inhibited_alerts: Vec<String>,
}

fn default_interval() -> u64 {
    60
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
