//! ScrapeManager - lifecycle registry for poll tasks
//!
//! Enforces the at-most-one-task-per-key invariant and owns the shared
//! result channel every task publishes into.
//!
//! ## Concurrency discipline
//!
//! Start/stop/restart may be called concurrently from different command
//! handling contexts. The registry map sits behind a single mutex; the lock
//! is never held across an `.await`, and shutdown signals are sent only
//! after the lock is released. Removal from the registry happens the moment
//! a stop is requested, not when the task actually exits, so a new task may
//! be started under the same key immediately.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::TargetConfig;
use crate::prometheus::{FetcherFactory, default_fetcher_factory};
use crate::{PollResult, TaskKey};

use super::error::ScrapeError;
use super::task::PollTaskHandle;

/// Poll tasks block sending once this many results are queued unread.
const RESULT_CHANNEL_CAPACITY: usize = 64;

pub struct ScrapeManager {
    /// TaskKey → handle registry. Mutated under the lock only.
    tasks: Mutex<HashMap<TaskKey, PollTaskHandle>>,

    /// Cloned into every spawned task
    result_tx: mpsc::Sender<PollResult>,

    /// Handed out once, to the correlator
    result_rx: Mutex<Option<mpsc::Receiver<PollResult>>>,

    fetchers: FetcherFactory,
}

impl ScrapeManager {
    pub fn new() -> Self {
        Self::with_fetcher_factory(default_fetcher_factory())
    }

    /// Build a manager whose tasks fetch through `fetchers` instead of the
    /// default HTTP client.
    pub fn with_fetcher_factory(fetchers: FetcherFactory) -> Self {
        let (result_tx, result_rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

        Self {
            tasks: Mutex::new(HashMap::new()),
            result_tx,
            result_rx: Mutex::new(Some(result_rx)),
            fetchers,
        }
    }

    /// Spawn a poll task for `config` under (guild_id, config.name).
    ///
    /// Fails with `AlreadyRunning` if a task exists for that key; a running
    /// task is never silently replaced. Callers must stop it first.
    pub fn start(&self, guild_id: &str, config: TargetConfig) -> Result<(), ScrapeError> {
        let key = TaskKey::new(guild_id, &config.name);

        let mut tasks = self.tasks.lock().expect("scrape registry lock poisoned");
        if tasks.contains_key(&key) {
            return Err(ScrapeError::AlreadyRunning(key));
        }

        let handle = self.spawn_task(key.clone(), config);
        tasks.insert(key.clone(), handle);
        drop(tasks);

        debug!(%key, "scraper started");
        Ok(())
    }

    /// Signal the task for (guild_id, target_name) to stop and remove it
    /// from the registry.
    ///
    /// Removal is synchronous; the task itself exits at its next select
    /// point, so callers must not assume it has fully drained.
    pub fn stop(&self, guild_id: &str, target_name: &str) -> Result<(), ScrapeError> {
        let key = TaskKey::new(guild_id, target_name);

        let handle = self
            .tasks
            .lock()
            .expect("scrape registry lock poisoned")
            .remove(&key)
            .ok_or_else(|| ScrapeError::NotRunning(key.clone()))?;

        // Signal outside the lock
        handle.shutdown();

        debug!(%key, "scraper stopped");
        Ok(())
    }

    /// Stop the task for this key and start a new one with `config`, as one
    /// registry update.
    ///
    /// Fails with `NotRunning` if no task was running; restarting a target
    /// that was never started is an observable error, not an implicit start.
    pub fn restart(&self, guild_id: &str, config: TargetConfig) -> Result<(), ScrapeError> {
        let key = TaskKey::new(guild_id, &config.name);

        let mut tasks = self.tasks.lock().expect("scrape registry lock poisoned");
        let old = tasks
            .remove(&key)
            .ok_or_else(|| ScrapeError::NotRunning(key.clone()))?;

        let handle = self.spawn_task(key.clone(), config);
        tasks.insert(key.clone(), handle);
        drop(tasks);

        old.shutdown();

        debug!(%key, "scraper restarted");
        Ok(())
    }

    /// The single shared result stream for all tasks across all guilds.
    ///
    /// Returns `None` after the first call; there is exactly one consumer.
    pub fn take_results(&self) -> Option<mpsc::Receiver<PollResult>> {
        self.result_rx
            .lock()
            .expect("result receiver lock poisoned")
            .take()
    }

    /// Keys of all currently registered tasks.
    pub fn running_keys(&self) -> Vec<TaskKey> {
        self.tasks
            .lock()
            .expect("scrape registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// The config snapshot the task for this key was started with.
    pub fn task_snapshot(&self, guild_id: &str, target_name: &str) -> Option<TargetConfig> {
        let key = TaskKey::new(guild_id, target_name);
        self.tasks
            .lock()
            .expect("scrape registry lock poisoned")
            .get(&key)
            .map(|handle| handle.snapshot.clone())
    }

    /// Stop every running task. Used on process exit.
    pub fn shutdown(&self) {
        let drained: Vec<_> = {
            let mut tasks = self.tasks.lock().expect("scrape registry lock poisoned");
            tasks.drain().collect()
        };

        for (key, handle) in drained {
            handle.shutdown();
            debug!(%key, "scraper stopped");
        }
    }

    fn spawn_task(&self, key: TaskKey, config: TargetConfig) -> PollTaskHandle {
        let fetcher = (self.fetchers)(&config);
        PollTaskHandle::spawn(key, config, fetcher, self.result_tx.clone())
    }
}

impl Default for ScrapeManager {
    fn default() -> Self {
        Self::new()
    }
}
