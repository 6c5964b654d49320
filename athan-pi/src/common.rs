//! Contains common, primitive types shared across the crate.
//!
//! The five canonical prayers are modeled as a closed enum rather than bare
//! strings so the schedule rules (pre-segment exclusions, payload variants)
//! can be written as exhaustive matches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five canonical daily prayers, in their fixed daily order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All prayers in daily order. Iteration order is the emission order of
    /// schedule events, which makes the builder's sort stable and predictable.
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// The canonical display name, also used in event labels and when
    /// matching the upstream schedule page.
    pub fn name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    /// Whether this is the last prayer of the day. The last prayer gets a
    /// dedicated evening pre-event instead of a looping recitation segment.
    pub fn is_last_of_day(&self) -> bool {
        matches!(self, Prayer::Isha)
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
