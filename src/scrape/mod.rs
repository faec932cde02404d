//! Scrape orchestration and alert correlation
//!
//! One poll task runs per (guild, target) pair, each as an independent async
//! task communicating via Tokio channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!   command layer
//!        │ start / stop / restart
//!   ┌────▼─────────┐
//!   │ ScrapeManager│  registry: TaskKey → PollTaskHandle
//!   └────┬─────────┘
//!        │ spawns
//!   ┌────▼────┐  ┌─────────┐  ┌─────────┐
//!   │PollTask │  │PollTask │  │PollTask │   one per (guild, target)
//!   └────┬────┘  └────┬────┘  └────┬────┘
//!        └────────────┼────────────┘
//!                     │ PollResult (mpsc, many producers / one consumer)
//!              ┌──────▼──────┐
//!              │ Correlator  │  fresh config read → filter → deliver
//!              └─────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! A target's creation starts its task, an update restarts it (stop then
//! start with the new config, never an in-place mutation), and a removal
//! stops it. A running task only sees the config snapshot it was started
//! with; the correlator compensates by re-reading the store on every
//! delivery.

pub mod correlator;
pub mod error;
pub mod manager;
pub mod task;

pub use correlator::CorrelatorHandle;
pub use error::ScrapeError;
pub use manager::ScrapeManager;
pub use task::PollTaskHandle;
