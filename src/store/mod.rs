//! Configuration store for guild scrape targets
//!
//! The store owns every `GuildConfig`; the scrape side only ever reads
//! snapshots from it. Reads taken by the correlator are deliberately fresh
//! (per delivery, not per poll) so configuration edits take effect without
//! waiting for a task restart.
//!
//! ## Design
//!
//! - **Trait-based**: `ConfigStore` allows swapping implementations
//! - **Async**: all operations are async for compatibility with Tokio tasks
//! - **Snapshot reads**: `get_guild_config` returns an owned copy, never a
//!   reference into shared state

pub mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::config::GuildConfig;

/// Persistent (or in-memory) home of the guild configurations.
///
/// Implementations must be `Send + Sync` as they are shared across the
/// command handlers and the correlator task.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch a snapshot of one guild's configuration.
    async fn get_guild_config(&self, guild_id: &str) -> StoreResult<GuildConfig>;

    /// All guild configurations. Startup walks this to spawn the initial
    /// set of scrapers.
    async fn get_guild_configs(&self) -> StoreResult<Vec<GuildConfig>>;

    /// Insert or replace a guild's configuration wholesale.
    async fn set_guild_config(&self, config: GuildConfig) -> StoreResult<()>;

    /// Drop all stored state for a guild.
    async fn clear_guild(&self, guild_id: &str) -> StoreResult<()>;
}
