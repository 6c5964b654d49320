//! In-memory fakes for the engine's I/O edges, shared across test modules.

use crate::components::audio::AudioSink;
use crate::components::store::OffsetStore;
use crate::engine::Clock;
use crate::errors::{PlaybackError, SourceError, StoreError};
use crate::notify::Notifier;
use crate::schedule::PrayerTimes;
use crate::source::ScheduleSource;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records every transport call; clip duration is fixed at construction.
pub struct RecordingSink {
    duration: Option<Duration>,
    plays: Mutex<Vec<(PathBuf, f64)>>,
    stops: AtomicUsize,
}

impl RecordingSink {
    pub fn with_duration(secs: u64) -> Self {
        Self {
            duration: Some(Duration::from_secs(secs)),
            plays: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    /// A sink whose resources all appear missing.
    pub fn missing_resource() -> Self {
        Self {
            duration: None,
            plays: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn played_paths(&self) -> Vec<PathBuf> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn play_offsets(&self) -> Vec<f64> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .map(|(_, offset)| *offset)
            .collect()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn play_from(&self, path: &Path, start_at: Duration) -> Result<(), PlaybackError> {
        if self.duration.is_none() {
            return Err(PlaybackError::MissingResource(path.to_path_buf()));
        }
        self.plays
            .lock()
            .unwrap()
            .push((path.to_path_buf(), start_at.as_secs_f64()));
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn clip_duration(&self, path: &Path) -> Result<Duration, PlaybackError> {
        self.duration
            .ok_or_else(|| PlaybackError::MissingResource(path.to_path_buf()))
    }
}

/// Offset store backed by a single in-memory value.
#[derive(Default)]
pub struct MemoryOffsetStore {
    value: Mutex<f64>,
}

impl MemoryOffsetStore {
    pub fn starting_at(offset: f64) -> Self {
        Self {
            value: Mutex::new(offset),
        }
    }

    pub fn current(&self) -> f64 {
        *self.value.lock().unwrap()
    }

    pub fn set(&self, offset: f64) {
        *self.value.lock().unwrap() = offset;
    }
}

impl OffsetStore for MemoryOffsetStore {
    fn load(&self) -> f64 {
        self.current()
    }

    fn save(&self, offset_sec: f64) -> Result<(), StoreError> {
        self.set(offset_sec);
        Ok(())
    }
}

/// Serves a fixed set of prayer times; can be flipped to unavailable.
pub struct StaticSource {
    times: PrayerTimes,
    down: AtomicBool,
}

impl StaticSource {
    pub fn serving(times: PrayerTimes) -> Self {
        Self {
            times,
            down: AtomicBool::new(false),
        }
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }
}

impl ScheduleSource for StaticSource {
    fn fetch_today(&self) -> Result<PrayerTimes, SourceError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable("source is down"));
        }
        Ok(self.times.clone())
    }
}

/// Settable clock reporting its instant in UTC.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        chrono_tz::UTC.from_utc_datetime(&self.now.lock().unwrap())
    }
}

/// Collects sent notifications.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    #[allow(dead_code)]
    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, title: &str, message: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}
