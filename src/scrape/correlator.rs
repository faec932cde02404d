//! Correlator - matches raw poll results back to live configuration
//!
//! The single consumer of the shared result channel. Each result is
//! re-resolved against the *current* store state rather than the snapshot
//! the producing task ran with: a target edited after the poll went out is
//! filtered and routed by its new config, and a target deleted mid-flight
//! just drops its result.
//!
//! Results are processed strictly one at a time in arrival order; delivery
//! ordering within a channel depends on it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, instrument, trace, warn};

use crate::PollResult;
use crate::delivery::AlertSink;
use crate::prometheus::filter_alerts;
use crate::store::ConfigStore;

/// Commands that can be sent to the correlator
#[derive(Debug)]
pub enum CorrelatorCommand {
    /// Gracefully shut down the correlator
    Shutdown,
}

pub struct Correlator {
    store: Arc<dyn ConfigStore>,
    sink: Arc<dyn AlertSink>,

    /// The shared result channel, taken from the scrape manager
    result_rx: mpsc::Receiver<PollResult>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<CorrelatorCommand>,
}

impl Correlator {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        sink: Arc<dyn AlertSink>,
        result_rx: mpsc::Receiver<PollResult>,
        command_rx: mpsc::Receiver<CorrelatorCommand>,
    ) -> Self {
        Self {
            store,
            sink,
            result_rx,
            command_rx,
        }
    }

    /// Run the correlator's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("correlator started");

        loop {
            tokio::select! {
                result = self.result_rx.recv() => {
                    match result {
                        Some(result) => self.handle_result(result).await,
                        None => {
                            warn!("result channel closed, shutting down");
                            break;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(CorrelatorCommand::Shutdown) | None => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("correlator stopped");
    }

    /// Resolve one result against current configuration and deliver.
    ///
    /// Every failure here is non-fatal: the result is dropped and the next
    /// poll tick retries the target naturally.
    #[instrument(skip(self, result), fields(guild = %result.guild_id, target = %result.target_name))]
    async fn handle_result(&self, result: PollResult) {
        // Fresh read, not the poll task's snapshot
        let guild_config = match self.store.get_guild_config(&result.guild_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!("failed to get guild config: {e}");
                return;
            }
        };

        let Some(target) = guild_config.find_target(&result.target_name) else {
            // Target was removed after this poll was already in flight
            warn!(
                "guild {} has no scrape target named {}, dropping result",
                result.guild_id, result.target_name
            );
            return;
        };

        let filtered = filter_alerts(result.alerts, &target.inhibited_alerts);
        if filtered.is_empty() {
            trace!("nothing to deliver after filtering");
            return;
        }

        if let Err(e) = self
            .sink
            .deliver(&target.channel_id, &target.name, &filtered)
            .await
        {
            error!("failed to deliver alerts: {e:#}");
        }
    }
}

/// Handle for controlling the correlator
#[derive(Clone)]
pub struct CorrelatorHandle {
    sender: mpsc::Sender<CorrelatorCommand>,
}

impl CorrelatorHandle {
    /// Spawn the correlator as a tokio task and return a handle.
    pub fn spawn(
        store: Arc<dyn ConfigStore>,
        sink: Arc<dyn AlertSink>,
        result_rx: mpsc::Receiver<PollResult>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = Correlator::new(store, sink, result_rx, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Gracefully shut down the correlator.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(CorrelatorCommand::Shutdown).await;
    }
}
