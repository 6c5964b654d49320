//! Defines all configuration structures for the Athan Pi engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`. Every field has a default matching the
//! reference deployment, so a missing or partial config file still yields a
//! working daemon.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The top-level configuration for the [`AthanEngine`](crate::engine::AthanEngine).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AthanConfig {
    /// The timezone all schedule calculations run in. Uses IANA Time Zone
    /// Database names (e.g., "America/Chicago").
    pub timezone: Tz,

    /// How often the engine's steady-state tick runs.
    pub poll_interval_secs: u64,

    /// How long after its scheduled instant an event is still considered due.
    /// An event whose window fully elapses while the engine is not running
    /// is dropped, never fired late.
    pub trigger_window_secs: u64,

    /// Where today's prayer times come from.
    pub source: SourceConfig,

    /// The ntfy.sh topic push notifications are posted to. `None` disables
    /// notifications entirely.
    pub ntfy_topic: Option<String>,

    /// Settings for the looping recitation segment played before prayers.
    pub preclip: PreclipConfig,

    /// The audio files the schedule dispatches to.
    pub sounds: SoundConfig,
}

/// Configuration for the HTTP schedule source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Page listing today's prayer times.
    pub url: String,
    /// Hard cap on each fetch; a stalled upstream must never stall a tick.
    pub fetch_timeout_secs: u64,
}

/// Configuration for the daily recitation pre-segment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreclipConfig {
    /// Wall-clock length of one segment session.
    pub window_secs: u64,
    /// Durable record of how far into the recitation file playback has
    /// progressed across sessions.
    pub state_path: PathBuf,
}

/// The audio files the engine plays. Paths that do not exist are warned
/// about at startup and skipped at fire time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// The general adhan, played for every prayer except Fajr.
    pub adhan: PathBuf,
    /// The Fajr variant of the adhan.
    pub adhan_fajr: PathBuf,
    /// A short clip for operator test playback.
    pub short: PathBuf,
    /// Evening remembrance, played 19.45 minutes before the last prayer.
    pub evening_athkar: PathBuf,
    /// Morning remembrance, played at the fixed 06:30 event.
    pub morning_athkar: PathBuf,
    /// Surat al-Kahf, played before Asr on the congregational day.
    pub kahf: PathBuf,
    /// The long recitation file the segment player works through.
    pub daily_quran: PathBuf,
}

impl AthanConfig {
    /// Loads configuration from `athand.toml` in the working directory,
    /// falling back to defaults if the file is absent.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("athand")
    }

    /// Loads configuration from the named config file (extension inferred).
    pub fn load_from(name: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Every configured sound path, for startup existence checks.
    pub fn all_sound_paths(&self) -> [&PathBuf; 7] {
        [
            &self.sounds.adhan,
            &self.sounds.adhan_fajr,
            &self.sounds.short,
            &self.sounds.evening_athkar,
            &self.sounds.morning_athkar,
            &self.sounds.kahf,
            &self.sounds.daily_quran,
        ]
    }
}

impl Default for AthanConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Chicago,
            poll_interval_secs: 5,
            trigger_window_secs: 60,
            source: SourceConfig::default(),
            ntfy_topic: Some("my_athan".to_string()),
            preclip: PreclipConfig::default(),
            sounds: SoundConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://epicmasjid.org/".to_string(),
            fetch_timeout_secs: 20,
        }
    }
}

impl Default for PreclipConfig {
    fn default() -> Self {
        Self {
            window_secs: 600,
            state_path: PathBuf::from("./quran_preclip_state.json"),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            adhan: PathBuf::from("./audio/athanfull.mp3"),
            adhan_fajr: PathBuf::from("./audio/athanfullfajr.mp3"),
            short: PathBuf::from("./audio/athanshort.mp3"),
            evening_athkar: PathBuf::from("./audio/athkar_masaa.mp3"),
            morning_athkar: PathBuf::from("./audio/morning_athkar.mp3"),
            kahf: PathBuf::from("./audio/alkahf.mp3"),
            daily_quran: PathBuf::from("./audio/daily_quran.mp3"),
        }
    }
}
