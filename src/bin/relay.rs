use std::sync::Arc;

use alert_relay::config::read_config_file;
use alert_relay::delivery::DiscordSink;
use alert_relay::scrape::{CorrelatorHandle, ScrapeManager};
use alert_relay::store::{ConfigStore, MemoryStore};
use anyhow::Context;
use clap::Parser;
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("alert_relay", LevelFilter::TRACE),
        ("relay", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let token =
        std::env::var("DISCORD_BOT_TOKEN").context("DISCORD_BOT_TOKEN must be set")?;

    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    let manager = ScrapeManager::new();

    // Seed the store from the config file
    if let Some(guilds) = config.guilds {
        for guild in guilds {
            store.set_guild_config(guild).await?;
        }
    }

    // Start a scraper for every stored target
    for guild in store.get_guild_configs().await? {
        for target in guild.targets {
            manager.start(&guild.guild_id, target)?;
        }
    }

    let results = manager
        .take_results()
        .expect("result receiver already taken");
    let sink = Arc::new(DiscordSink::new(token));
    let correlator = CorrelatorHandle::spawn(store, sink, results);

    debug!("relay running, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    debug!("shutdown signal caught");

    correlator.shutdown().await;
    manager.shutdown();

    Ok(())
}
