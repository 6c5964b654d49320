//! Defines the event and command types that move through the engine.
//!
//! A [`ScheduleEvent`] is an immutable value created fresh each time the
//! day's schedule is (re)built. The engine never mutates events; a refresh
//! discards the whole generation and replaces it.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::PathBuf;

/// How an event is dispatched when its trigger window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Play the payload file once through the audio sink.
    SimplePlay,
    /// Run a bounded, resumable session of the daily recitation segment.
    LoopingSegment,
}

/// One scheduled audio event for the current day.
#[derive(Debug, Clone)]
pub struct ScheduleEvent {
    /// Human-readable label, unique within a generation (e.g. "Fajr",
    /// "Dhuhr-Pre", "Kahf-PreAsr").
    pub label: String,
    /// The local instant the event becomes due.
    pub fire_at: NaiveDateTime,
    pub kind: EventKind,
    /// The file to play for `SimplePlay` events. `LoopingSegment` events
    /// carry no payload; the segment resource comes from configuration.
    pub payload: Option<PathBuf>,
}

/// Identifies a fired event within one schedule generation.
pub type FiredKey = (String, NaiveDate, NaiveTime);

impl ScheduleEvent {
    pub fn simple(label: impl Into<String>, fire_at: NaiveDateTime, payload: PathBuf) -> Self {
        Self {
            label: label.into(),
            fire_at,
            kind: EventKind::SimplePlay,
            payload: Some(payload),
        }
    }

    pub fn looping(label: impl Into<String>, fire_at: NaiveDateTime) -> Self {
        Self {
            label: label.into(),
            fire_at,
            kind: EventKind::LoopingSegment,
            payload: None,
        }
    }

    /// The fired-set key for this event. Keyed on label, date, and
    /// time-of-day so a rebuilt generation with a coincidentally identical
    /// event produces the same key only for genuinely the same occurrence.
    pub fn key(&self) -> FiredKey {
        (self.label.clone(), self.fire_at.date(), self.fire_at.time())
    }
}

/// Fire-and-forget broadcast toward any listening UI layer, sent at most
/// once per fired event. No delivery guarantee.
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    pub message: String,
}

/// Manual operator actions accepted on the engine's command channel.
///
/// Each command is idempotent and must never block or corrupt engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Play the short test clip once.
    TestShortPlay,
    /// Start a recitation segment session now, as a firing would.
    TestPreclipSegment,
    /// Force the stored recitation offset back to zero.
    ResetOffset,
    /// Raise the cooperative stop signal and halt the audio transport.
    StopAll,
}
