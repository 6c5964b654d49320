//! # Athan Pi
//!
//! A resilient daily prayer-announcement engine for Rust.
//!
//! Athan Pi drives time-of-day audio events computed from an external daily
//! schedule. Each morning (and again after 02:00, to absorb late-posted
//! corrections) the engine rebuilds the day's event list from a
//! [`ScheduleSource`](source::ScheduleSource), then polls wall-clock time and
//! fires every due event exactly once per schedule generation.
//!
//! ## Core Concepts
//!
//! - **Schedule generation**: the full event list produced by one build.
//!   Rebuilt wholesale on refresh; the fired-set is cleared with it, so a
//!   stale generation can never suppress a new day's events.
//! - **Trigger window**: an event is due while `now - fire_at` is within a
//!   fixed window (60 s by default). A window that elapses while the process
//!   is paused is silently skipped; announcements are never fired late.
//! - **Segment sessions**: a long recitation file is played in bounded daily
//!   windows by the [`SegmentPlayer`](components::player::SegmentPlayer),
//!   which persists its position through an
//!   [`OffsetStore`](components::store::OffsetStore) so the next session
//!   resumes where the last one stopped.
//! - **Narrow I/O edges**: schedule fetching, the audio transport, and push
//!   notifications sit behind traits, so the engine core is testable with
//!   fakes and deterministic time.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use athan_pi::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AthanConfig::default();
//!
//!     let source = Arc::new(HttpScheduleSource::new(config.source.clone()));
//!     let sink = Arc::new(RodioSink::spawn());
//!     let engine = AthanEngine::new(config, source, sink);
//!
//!     // Runs until Ctrl+C.
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Athan Pi";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod notify;
pub mod schedule;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

/// A prelude module for easy importing of the most common Athan Pi types.
pub mod prelude {
    pub use crate::common::Prayer;
    pub use crate::components::audio::{AudioSink, RodioSink};
    pub use crate::components::player::SegmentPlayer;
    pub use crate::components::store::{JsonFileOffsetStore, OffsetStore};
    pub use crate::config::AthanConfig;
    pub use crate::engine::{AthanEngine, Clock, SystemClock};
    pub use crate::errors::{PlaybackError, SourceError, StoreError};
    pub use crate::events::{EventKind, OperatorCommand, RefreshSignal, ScheduleEvent};
    pub use crate::notify::{Notifier, NtfyNotifier};
    pub use crate::source::{HttpScheduleSource, ScheduleSource};
}
