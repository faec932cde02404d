//! PollTask - fetches alerts for a single target on its interval
//!
//! Each (guild, target) pair gets its own poll task. The task runs in an
//! infinite loop, fetching at the configured interval and pushing each
//! result onto the shared result channel.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → fetch alerts → send PollResult → Correlator
//!     ↑
//!     └─── Shutdown command (from the scrape manager)
//! ```
//!
//! Cancellation is cooperative: the shutdown signal is only observed at the
//! select point, so a fetch already underway still completes and may deliver
//! one final result after `stop` has returned. The correlator's fresh-read
//! design absorbs that.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, instrument, trace, warn};

use crate::config::TargetConfig;
use crate::prometheus::AlertFetcher;
use crate::{PollResult, TaskKey};

/// Commands that can be sent to a running poll task
#[derive(Debug)]
pub enum PollCommand {
    /// Stop the task. No new fetch is started after this is observed.
    Shutdown,
}

/// Background loop polling a single target
pub struct PollTask {
    key: TaskKey,

    /// Private snapshot taken at start time; later store edits are
    /// invisible until the task is restarted
    config: TargetConfig,

    fetcher: Arc<dyn AlertFetcher>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<PollCommand>,

    /// Shared result channel, one sender clone per task
    result_tx: mpsc::Sender<PollResult>,
}

impl PollTask {
    pub fn new(
        key: TaskKey,
        config: TargetConfig,
        fetcher: Arc<dyn AlertFetcher>,
        command_rx: mpsc::Receiver<PollCommand>,
        result_tx: mpsc::Sender<PollResult>,
    ) -> Self {
        Self {
            key,
            config,
            fetcher,
            command_rx,
            result_tx,
        }
    }

    /// Run the task's main loop until shutdown.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn run(mut self) {
        debug!("scraper started");

        let mut ticker = interval(Duration::from_secs(self.config.interval.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // A pending shutdown always wins over a ready tick, so no
                // new fetch starts once stop has been requested
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(PollCommand::Shutdown) | None => {
                            debug!("scraper stopped");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    trace!("beginning scrape");

                    match self.fetcher.fetch_alerts().await {
                        Ok(alerts) => {
                            let result = PollResult {
                                guild_id: self.key.guild_id.clone(),
                                target_name: self.key.target_name.clone(),
                                alerts,
                            };

                            // May block when the consumer is slow; only this
                            // task waits, never the manager's registry.
                            if self.result_tx.send(result).await.is_err() {
                                warn!("result channel closed, shutting down");
                                break;
                            }
                        }
                        Err(e) => {
                            // Logged and skipped until the next tick
                            error!("error occurred while scraping: {e:#}");
                        }
                    }
                }
            }
        }
    }
}

/// Handle for one running poll task
///
/// Owned exclusively by the scrape manager's registry entry for its key.
#[derive(Clone)]
pub struct PollTaskHandle {
    sender: mpsc::Sender<PollCommand>,

    /// The config snapshot the task was started with
    pub snapshot: TargetConfig,
}

impl PollTaskHandle {
    /// Spawn a poll task and return its handle.
    pub fn spawn(
        key: TaskKey,
        config: TargetConfig,
        fetcher: Arc<dyn AlertFetcher>,
        result_tx: mpsc::Sender<PollResult>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let snapshot = config.clone();
        let task = PollTask::new(key, config, fetcher, cmd_rx, result_tx);

        tokio::spawn(task.run());

        Self {
            sender: cmd_tx,
            snapshot,
        }
    }

    /// Signal the task to stop. Never blocks; an already-exiting task simply
    /// ignores the signal.
    pub fn shutdown(&self) {
        let _ = self.sender.try_send(PollCommand::Shutdown);
    }
}
