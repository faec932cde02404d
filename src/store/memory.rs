//! In-memory store
//!
//! No persistence across restarts; the seed file re-creates state at boot.
//! Useful for single-node deployments and for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::GuildConfig;

use super::error::{StoreError, StoreResult};
use super::ConfigStore;

#[derive(Default)]
pub struct MemoryStore {
    guilds: RwLock<HashMap<String, GuildConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_guild_config(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        let guilds = self.guilds.read().await;
        guilds
            .get(guild_id)
            .cloned()
            .ok_or_else(|| StoreError::GuildNotFound(guild_id.to_string()))
    }

    async fn get_guild_configs(&self) -> StoreResult<Vec<GuildConfig>> {
        let guilds = self.guilds.read().await;
        Ok(guilds.values().cloned().collect())
    }

    async fn set_guild_config(&self, config: GuildConfig) -> StoreResult<()> {
        debug!("setting guild config for {}", config.guild_id);

        let mut guilds = self.guilds.write().await;
        guilds.insert(config.guild_id.clone(), config);
        Ok(())
    }

    async fn clear_guild(&self, guild_id: &str) -> StoreResult<()> {
        let mut guilds = self.guilds.write().await;
        guilds.remove(guild_id);
        Ok(())
    }
}
