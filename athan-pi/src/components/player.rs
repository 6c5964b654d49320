//! The resumable segment player.
//!
//! One "segment session" plays a bounded wall-clock window of a long
//! recitation file, looping back to the start whenever the file ends before
//! the window does. The exact elapsed-into-resource position at window
//! close is persisted, so the next session picks up seamlessly where this
//! one left off.

use crate::components::audio::AudioSink;
use crate::components::store::OffsetStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{info, warn};

/// Drives one bounded, possibly looping playback session of a single
/// resource. Spawned fire-and-forget so the engine's poll cadence is never
/// blocked by audio.
pub struct SegmentPlayer {
    sink: Arc<dyn AudioSink>,
    store: Arc<dyn OffsetStore>,
    resource: PathBuf,
    window: Duration,
}

impl SegmentPlayer {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        store: Arc<dyn OffsetStore>,
        resource: PathBuf,
        window: Duration,
    ) -> Self {
        Self {
            sink,
            store,
            resource,
            window,
        }
    }

    /// Runs the session until the window closes or `stop` fires.
    ///
    /// The saved offset is `(starting_offset + elapsed_wall_time) mod
    /// duration`, computed at the instant the session ends, whether that is
    /// mid-clip or at a loop boundary. A missing resource or unknown
    /// duration makes the whole call a logged no-op.
    pub async fn run(self, mut stop: broadcast::Receiver<()>) {
        let duration = match self.sink.clip_duration(&self.resource) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => {
                warn!(resource = %self.resource.display(), error = %e, "segment session skipped");
                return;
            }
        };

        let initial = self.store.load() % duration;
        let started = Instant::now();
        let deadline = started + self.window;
        info!(
            resource = %self.resource.display(),
            offset_sec = initial as u64,
            window_sec = self.window.as_secs(),
            "segment session started"
        );

        let mut offset = initial;
        let mut stopped = false;
        loop {
            if let Err(e) = self
                .sink
                .play_from(&self.resource, Duration::from_secs_f64(offset))
            {
                warn!(resource = %self.resource.display(), error = %e, "segment playback failed");
                break;
            }

            // Play for whichever runs out first: the rest of the clip or
            // the rest of the window.
            let remaining_clip = Duration::from_secs_f64((duration - offset).max(0.0));
            let remaining_window = deadline.saturating_duration_since(Instant::now());
            let play_time = remaining_clip.min(remaining_window);

            tokio::select! {
                _ = tokio::time::sleep(play_time) => {}
                res = stop.recv() => {
                    if res.is_ok() {
                        stopped = true;
                    } else {
                        // Stop channel gone; just wait out the clip.
                        tokio::time::sleep(play_time).await;
                    }
                }
            }

            self.sink.stop();
            if stopped || Instant::now() >= deadline {
                break;
            }
            offset = 0.0;
        }

        let elapsed = Instant::now()
            .saturating_duration_since(started)
            .min(self.window)
            .as_secs_f64();
        let next = (initial + elapsed) % duration;
        match self.store.save(next) {
            Ok(()) => info!(
                resource = %self.resource.display(),
                next_offset_sec = next as u64,
                "segment session finished"
            ),
            Err(e) => warn!(error = %e, "could not save segment offset"),
        }
    }
}
