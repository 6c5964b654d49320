//! Fetching today's prayer times.
//!
//! The engine only depends on the [`ScheduleSource`] trait; the bundled
//! implementation scrapes the masjid's public page. Fetching is blocking by
//! design (the engine wraps calls in `spawn_blocking`), with a fixed request
//! timeout so a stalled upstream can never stall a tick.

use crate::common::Prayer;
use crate::config::SourceConfig;
use crate::errors::SourceError;
use crate::schedule::PrayerTimes;
use chrono::NaiveTime;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

/// Supplies the named prayer times for the current day.
///
/// A partial result (some prayers missing) is valid; the builder simply
/// omits the corresponding events.
pub trait ScheduleSource: Send + Sync {
    fn fetch_today(&self) -> Result<PrayerTimes, SourceError>;
}

/// Scrapes prayer times from an HTML page that lists each prayer name
/// followed by its adhan and iqama times (e.g. `Fajr 5:30 AM 5:50 AM`).
pub struct HttpScheduleSource {
    config: SourceConfig,
}

impl HttpScheduleSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

impl ScheduleSource for HttpScheduleSource {
    fn fetch_today(&self) -> Result<PrayerTimes, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.fetch_timeout_secs))
            .build()
            .map_err(SourceError::unavailable)?;
        let body = client
            .get(&self.config.url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(SourceError::unavailable)?;
        let times = parse_prayer_times(&body)?;
        debug!(url = %self.config.url, prayers = times.len(), "fetched schedule");
        Ok(times)
    }
}

/// Extracts the adhan time for each canonical prayer from page markup.
/// Prayers that do not match are omitted, not errors.
pub(crate) fn parse_prayer_times(html: &str) -> Result<PrayerTimes, SourceError> {
    // Flatten markup to the visible text the time rows live in.
    let tag_re = Regex::new(r"<[^>]*>").map_err(SourceError::unavailable)?;
    let text = tag_re.replace_all(html, " ");

    let mut times = PrayerTimes::new();
    for prayer in Prayer::ALL {
        let pattern = format!(
            r"(?i)\b{}\b\s+(\d{{1,2}}:\d{{2}}\s*[AP]M)\s+\d{{1,2}}:\d{{2}}\s*[AP]M",
            prayer.name()
        );
        let re = Regex::new(&pattern).map_err(SourceError::unavailable)?;
        if let Some(caps) = re.captures(&text) {
            let raw = caps[1].to_uppercase().replace(' ', "");
            if let Ok(time) = NaiveTime::parse_from_str(&raw, "%I:%M%p") {
                times.insert(prayer, time);
            }
        }
    }
    Ok(times)
}
