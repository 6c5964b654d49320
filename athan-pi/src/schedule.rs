//! Builds the day's ordered event list and decides when it must be rebuilt.
//!
//! The builder is a pure function from (fetched prayer times, date, config)
//! to a sorted list of [`ScheduleEvent`]s, which keeps every business rule
//! here testable without touching the network or the clock.

use crate::common::Prayer;
use crate::config::AthanConfig;
use crate::events::ScheduleEvent;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::BTreeMap;

/// The prayer times fetched for one day. May be a strict subset of the five
/// canonical prayers; missing entries simply produce no events.
pub type PrayerTimes = BTreeMap<Prayer, NaiveTime>;

/// Lead time of the looping recitation segment before each applicable prayer.
const PRECLIP_LEAD: Duration = Duration::minutes(5);

/// Lead time of the evening remembrance before the last prayer: 19.45
/// minutes, i.e. 19 minutes 27 seconds.
const EVENING_PRE_LEAD: Duration = Duration::seconds(1167);

/// Lead time of the Kahf recitation before Asr on the congregational day.
const KAHF_LEAD: Duration = Duration::minutes(31);

/// The fixed local time of the morning remembrance, independent of the
/// fetched schedule.
const MORNING_ATHKAR_TIME: NaiveTime = match NaiveTime::from_hms_opt(6, 30, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// The weekday on which congregational rules apply: no pre-segment before
/// Asr, and an additional Kahf recitation.
const CONGREGATIONAL_DAY: Weekday = Weekday::Fri;

/// Converts one day's fetched prayer timestamps into the full ordered event
/// list, applying the day-of-week and fixed-time rules.
///
/// The result is sorted ascending by fire time; events scheduled for the
/// same instant keep their emission order (stable sort).
pub fn build_schedule(
    times: &PrayerTimes,
    today: NaiveDate,
    config: &AthanConfig,
) -> Vec<ScheduleEvent> {
    let congregational = today.weekday() == CONGREGATIONAL_DAY;
    let mut events = Vec::new();

    for prayer in Prayer::ALL {
        let Some(&time) = times.get(&prayer) else {
            continue;
        };
        let fire_at = today.and_time(time);

        let payload = if prayer == Prayer::Fajr {
            config.sounds.adhan_fajr.clone()
        } else {
            config.sounds.adhan.clone()
        };
        events.push(ScheduleEvent::simple(prayer.name(), fire_at, payload));

        // Recitation segment 5 minutes before each prayer, except the last
        // prayer of the day and Asr on the congregational day.
        if !prayer.is_last_of_day() && !(prayer == Prayer::Asr && congregational) {
            events.push(ScheduleEvent::looping(
                format!("{prayer}-Pre"),
                fire_at - PRECLIP_LEAD,
            ));
        }
    }

    // Evening remembrance before the last prayer, only if the dedicated
    // file is actually present.
    if let Some(&isha) = times.get(&Prayer::Isha) {
        if config.sounds.evening_athkar.exists() {
            events.push(ScheduleEvent::simple(
                "Isha-Pre",
                today.and_time(isha) - EVENING_PRE_LEAD,
                config.sounds.evening_athkar.clone(),
            ));
        }
    }

    // Morning remembrance at a fixed time, independent of the fetched
    // schedule.
    events.push(ScheduleEvent::simple(
        "Morning",
        today.and_time(MORNING_ATHKAR_TIME),
        config.sounds.morning_athkar.clone(),
    ));

    if congregational {
        if let Some(&asr) = times.get(&Prayer::Asr) {
            events.push(ScheduleEvent::simple(
                "Kahf-PreAsr",
                today.and_time(asr) - KAHF_LEAD,
                config.sounds.kahf.clone(),
            ));
        }
    }

    events.sort_by_key(|e| e.fire_at);
    events
}

/// Tracks when the current schedule generation was built, and whether the
/// guaranteed post-02:00 rebuild has happened yet today.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    pub last_refresh_date: Option<NaiveDate>,
    pub refreshed_after_2am: bool,
}

/// The time-of-day after which every calendar day gets one additional
/// rebuild, to absorb late-posted or corrected times.
const POST_REFRESH_TIME: NaiveTime = match NaiveTime::from_hms_opt(2, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the schedule must be rebuilt at `now`: true if there has
    /// been no refresh at all, if the calendar date has changed, or if the
    /// day has not yet had its post-02:00 refresh and `now` is past 02:00.
    pub fn should_refresh(&self, now: NaiveDateTime) -> bool {
        let Some(last) = self.last_refresh_date else {
            return true;
        };
        if now.date() != last {
            return true;
        }
        !self.refreshed_after_2am && now.time() >= POST_REFRESH_TIME
    }

    /// Records a successful rebuild at `now`.
    pub fn mark_refreshed(&mut self, now: NaiveDateTime) {
        self.last_refresh_date = Some(now.date());
        self.refreshed_after_2am = now.time() >= POST_REFRESH_TIME;
    }

    /// Flips `refreshed_after_2am` once the day crosses 02:00, so the flag
    /// stays consistent even when the crossing tick itself did not rebuild.
    pub fn reconcile(&mut self, now: NaiveDateTime) {
        if !self.refreshed_after_2am
            && now.time() >= POST_REFRESH_TIME
            && Some(now.date()) == self.last_refresh_date
        {
            self.refreshed_after_2am = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn full_day_times() -> PrayerTimes {
        let mut times = PrayerTimes::new();
        times.insert(Prayer::Fajr, t(5, 30));
        times.insert(Prayer::Dhuhr, t(12, 15));
        times.insert(Prayer::Asr, t(15, 45));
        times.insert(Prayer::Maghrib, t(18, 50));
        times.insert(Prayer::Isha, t(20, 10));
        times
    }

    /// Config whose evening-athkar path actually exists, so the Isha-Pre
    /// rule applies.
    fn config_with_evening_file(dir: &tempfile::TempDir) -> AthanConfig {
        let mut config = AthanConfig::default();
        let evening = dir.path().join("athkar_masaa.mp3");
        std::fs::write(&evening, b"").unwrap();
        config.sounds.evening_athkar = evening;
        config
    }

    fn labels_and_times(events: &[ScheduleEvent]) -> Vec<(String, NaiveTime)> {
        events
            .iter()
            .map(|e| (e.label.clone(), e.fire_at.time()))
            .collect()
    }

    #[test]
    fn full_day_on_ordinary_weekday() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_evening_file(&dir);
        // A Thursday.
        let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();

        let events = build_schedule(&full_day_times(), today, &config);

        let expected = vec![
            ("Fajr-Pre".to_string(), t(5, 25)),
            ("Fajr".to_string(), t(5, 30)),
            ("Morning".to_string(), t(6, 30)),
            ("Dhuhr-Pre".to_string(), t(12, 10)),
            ("Dhuhr".to_string(), t(12, 15)),
            ("Asr-Pre".to_string(), t(15, 40)),
            ("Asr".to_string(), t(15, 45)),
            ("Maghrib-Pre".to_string(), t(18, 45)),
            ("Maghrib".to_string(), t(18, 50)),
            (
                "Isha-Pre".to_string(),
                NaiveTime::from_hms_opt(19, 50, 33).unwrap(),
            ),
            ("Isha".to_string(), t(20, 10)),
        ];
        assert_eq!(labels_and_times(&events), expected);
    }

    #[test]
    fn congregational_day_swaps_asr_pre_for_kahf() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_evening_file(&dir);
        // A Friday.
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();

        let events = build_schedule(&full_day_times(), today, &config);
        let labels: Vec<&str> = events.iter().map(|e| e.label.as_str()).collect();

        assert!(!labels.contains(&"Asr-Pre"));
        let kahf = events.iter().find(|e| e.label == "Kahf-PreAsr").unwrap();
        assert_eq!(kahf.fire_at.time(), t(15, 14));
        assert_eq!(kahf.kind, EventKind::SimplePlay);
    }

    #[test]
    fn sorted_ascending_with_stable_ties() {
        let config = AthanConfig::default();
        let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        // Fajr at 06:35 puts Fajr-Pre exactly at the fixed morning event's
        // time; emission order (prayers before the morning event) must hold.
        let mut times = PrayerTimes::new();
        times.insert(Prayer::Fajr, t(6, 35));

        let events = build_schedule(&times, today, &config);

        for pair in events.windows(2) {
            assert!(pair[0].fire_at <= pair[1].fire_at);
        }
        let tied: Vec<&str> = events
            .iter()
            .filter(|e| e.fire_at.time() == t(6, 30))
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(tied, vec!["Fajr-Pre", "Morning"]);
    }

    #[test]
    fn missing_prayers_are_omitted_not_errors() {
        let config = AthanConfig::default();
        let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        let mut times = PrayerTimes::new();
        times.insert(Prayer::Dhuhr, t(12, 15));

        let events = build_schedule(&times, today, &config);
        let labels: Vec<&str> = events.iter().map(|e| e.label.as_str()).collect();

        // Only Dhuhr, its pre-segment, and the fixed morning event.
        assert_eq!(labels, vec!["Morning", "Dhuhr-Pre", "Dhuhr"]);
    }

    #[test]
    fn evening_pre_skipped_when_file_missing() {
        let mut config = AthanConfig::default();
        config.sounds.evening_athkar = std::path::PathBuf::from("/nonexistent/athkar.mp3");
        let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();

        let events = build_schedule(&full_day_times(), today, &config);
        assert!(events.iter().all(|e| e.label != "Isha-Pre"));
    }

    #[test]
    fn playback_payloads_pick_fajr_variant() {
        let config = AthanConfig::default();
        let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        let events = build_schedule(&full_day_times(), today, &config);

        let fajr = events.iter().find(|e| e.label == "Fajr").unwrap();
        assert_eq!(fajr.payload.as_ref().unwrap(), &config.sounds.adhan_fajr);
        let dhuhr = events.iter().find(|e| e.label == "Dhuhr").unwrap();
        assert_eq!(dhuhr.payload.as_ref().unwrap(), &config.sounds.adhan);
        let pre = events.iter().find(|e| e.label == "Fajr-Pre").unwrap();
        assert_eq!(pre.kind, EventKind::LoopingSegment);
        assert!(pre.payload.is_none());
    }

    fn dt(date: (i32, u32, u32), h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, s).unwrap())
    }

    #[test]
    fn refresh_true_on_first_call() {
        let state = RefreshState::new();
        assert!(state.should_refresh(dt((2025, 3, 6), 0, 30, 0)));
    }

    #[test]
    fn refresh_false_after_post_2am_rebuild_same_day() {
        let mut state = RefreshState::new();
        let now = dt((2025, 3, 6), 9, 0, 0);
        state.mark_refreshed(now);
        assert!(state.refreshed_after_2am);
        assert!(!state.should_refresh(now));
        assert!(!state.should_refresh(now));
    }

    #[test]
    fn refresh_on_date_change() {
        let mut state = RefreshState::new();
        state.mark_refreshed(dt((2025, 3, 6), 9, 0, 0));
        assert!(state.should_refresh(dt((2025, 3, 7), 0, 0, 5)));
    }

    #[test]
    fn exactly_one_refresh_across_2am_when_polled_every_5s() {
        let mut state = RefreshState::new();
        // Day's first rebuild happened before 02:00.
        state.mark_refreshed(dt((2025, 3, 6), 1, 58, 0));
        assert!(!state.refreshed_after_2am);

        let mut refreshes = 0;
        let mut now = dt((2025, 3, 6), 1, 59, 0);
        let end = dt((2025, 3, 6), 2, 5, 0);
        while now <= end {
            if state.should_refresh(now) {
                refreshes += 1;
                state.mark_refreshed(now);
            }
            now += Duration::seconds(5);
        }
        assert_eq!(refreshes, 1);
    }

    #[test]
    fn reconcile_only_flips_flag_on_same_day_crossing() {
        let mut state = RefreshState::new();
        state.mark_refreshed(dt((2025, 3, 6), 1, 0, 0));

        // Before 02:00 nothing changes.
        state.reconcile(dt((2025, 3, 6), 1, 59, 55));
        assert!(!state.refreshed_after_2am);

        state.reconcile(dt((2025, 3, 6), 2, 0, 0));
        assert!(state.refreshed_after_2am);
    }
}
