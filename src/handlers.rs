//! Operator command operations
//!
//! The chat command layer parses interactions and calls into these
//! functions; they tie the store, the scrape manager, and the monitoring
//! client together. Each one reads a fresh guild snapshot, applies the
//! change, persists the whole snapshot back, and only then touches the
//! scrape lifecycle.

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

use crate::Alert;
use crate::config::{GuildConfig, TargetConfig};
use crate::prometheus::{FetcherFactory, filter_alerts};
use crate::scrape::ScrapeManager;
use crate::store::{ConfigStore, StoreError};

/// Fetch the target's current alerts on demand, filtered by its
/// inhibition list.
pub async fn get_alerts(
    store: &dyn ConfigStore,
    fetchers: &FetcherFactory,
    guild_id: &str,
    target_name: &str,
) -> Result<Vec<Alert>> {
    let guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    let target = guild_config
        .find_target(target_name)
        .ok_or_else(|| anyhow!("couldn't find scrape target with name \"{target_name}\""))?;

    let alerts = fetchers(target)
        .fetch_alerts()
        .await
        .context("failed to fetch alerts")?;

    Ok(filter_alerts(alerts, &target.inhibited_alerts))
}

pub async fn get_inhibitions(
    store: &dyn ConfigStore,
    guild_id: &str,
    target_name: &str,
) -> Result<Vec<String>> {
    let guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    let target = guild_config
        .find_target(target_name)
        .ok_or_else(|| anyhow!("couldn't find scrape target with name \"{target_name}\""))?;

    Ok(target.inhibited_alerts.clone())
}

/// Suppress an alert name for a target.
///
/// The mutation goes through `find_target_mut`, which borrows the element
/// inside the guild's target vector, so the persisted snapshot actually
/// carries the new inhibition.
pub async fn inhibit_alert(
    store: &dyn ConfigStore,
    guild_id: &str,
    target_name: &str,
    alert_name: &str,
) -> Result<()> {
    let mut guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    let target = guild_config
        .find_target_mut(target_name)
        .ok_or_else(|| anyhow!("couldn't find scrape target with name \"{target_name}\""))?;

    if !target.inhibited_alerts.iter().any(|name| name == alert_name) {
        target.inhibited_alerts.push(alert_name.to_string());
    }

    store
        .set_guild_config(guild_config)
        .await
        .context("failed to set guild config")?;

    debug!("inhibited alert {alert_name} for {guild_id}/{target_name}");
    Ok(())
}

/// Lift a suppression. Unknown alert names are a no-op.
pub async fn uninhibit_alert(
    store: &dyn ConfigStore,
    guild_id: &str,
    target_name: &str,
    alert_name: &str,
) -> Result<()> {
    let mut guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    let target = guild_config
        .find_target_mut(target_name)
        .ok_or_else(|| anyhow!("couldn't find scrape target with name \"{target_name}\""))?;

    target.inhibited_alerts.retain(|name| name != alert_name);

    store
        .set_guild_config(guild_config)
        .await
        .context("failed to set guild config")?;

    debug!("uninhibited alert {alert_name} for {guild_id}/{target_name}");
    Ok(())
}

pub async fn get_target_configs(
    store: &dyn ConfigStore,
    guild_id: &str,
) -> Result<Vec<TargetConfig>> {
    let guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    Ok(guild_config.targets)
}

/// Register a new scrape target for a guild and start polling it.
///
/// A guild with no stored config yet gets one created on the fly.
pub async fn create_target_config(
    store: &dyn ConfigStore,
    manager: &ScrapeManager,
    guild_id: &str,
    config: TargetConfig,
) -> Result<()> {
    let mut guild_config = match store.get_guild_config(guild_id).await {
        Ok(config) => config,
        Err(StoreError::GuildNotFound(_)) => GuildConfig::new(guild_id),
        Err(e) => return Err(e).context("failed to get guild config"),
    };

    if guild_config.find_target(&config.name).is_some() {
        bail!(
            "there is already a scrape target with the name \"{}\"",
            config.name
        );
    }

    guild_config.targets.push(config.clone());

    store
        .set_guild_config(guild_config)
        .await
        .context("failed to set guild config")?;

    manager
        .start(guild_id, config)
        .context("failed to start scraper")?;

    Ok(())
}

/// Replace a target's config and restart its poll task so the new
/// endpoint and interval take effect.
pub async fn update_target_config(
    store: &dyn ConfigStore,
    manager: &ScrapeManager,
    guild_id: &str,
    config: TargetConfig,
) -> Result<()> {
    let mut guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    let target = guild_config
        .find_target_mut(&config.name)
        .ok_or_else(|| anyhow!("couldn't find scrape target with name \"{}\"", config.name))?;

    *target = config.clone();

    store
        .set_guild_config(guild_config)
        .await
        .context("failed to set guild config")?;

    manager
        .restart(guild_id, config)
        .context("failed to restart scraper")?;

    Ok(())
}

/// Remove a target from the guild config and stop its poll task.
pub async fn remove_target_config(
    store: &dyn ConfigStore,
    manager: &ScrapeManager,
    guild_id: &str,
    target_name: &str,
) -> Result<()> {
    let mut guild_config = store
        .get_guild_config(guild_id)
        .await
        .context("failed to get guild config")?;

    let target_count = guild_config.targets.len();
    guild_config.targets.retain(|target| target.name != target_name);

    if guild_config.targets.len() == target_count {
        bail!("couldn't find scrape target with name \"{target_name}\"");
    }

    store
        .set_guild_config(guild_config)
        .await
        .context("failed to set guild config")?;

    manager
        .stop(guild_id, target_name)
        .context("failed to stop scraper")?;

    Ok(())
}
