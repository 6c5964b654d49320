//! Durable single-value storage for the recitation playback offset.
//!
//! The store is deliberately tiny: one non-negative number of seconds,
//! written at the end of each segment session and read at the start of the
//! next. A corrupt or missing record is never fatal; it simply means
//! playback restarts from the beginning.

use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Durable load/save for the segment playback offset, in seconds.
///
/// Assumed single-writer (one engine instance per deployment); individual
/// implementations serialize their own load/save pairs.
pub trait OffsetStore: Send + Sync {
    /// The last persisted offset, or 0.0 if none exists or the record is
    /// unreadable.
    fn load(&self) -> f64;

    fn save(&self, offset_sec: f64) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct OffsetRecord {
    offset_sec: f64,
}

/// File-backed [`OffsetStore`] holding one JSON record
/// (`{"offset_sec": 123.4}`), compatible with the daemon's historical state
/// file.
pub struct JsonFileOffsetStore {
    path: PathBuf,
    // Serializes load/save against concurrent operator commands
    // (reset-offset) and an in-flight segment session.
    guard: Mutex<()>,
}

impl JsonFileOffsetStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    fn read_record(&self) -> Result<f64, StoreError> {
        let raw = fs::read_to_string(&self.path)?;
        let record: OffsetRecord =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(record.offset_sec)
    }
}

impl OffsetStore for JsonFileOffsetStore {
    fn load(&self) -> f64 {
        let _held = self.guard.lock().unwrap_or_else(|p| p.into_inner());
        if !self.path.exists() {
            return 0.0;
        }
        match self.read_record() {
            Ok(offset) if offset.is_finite() && offset >= 0.0 => offset,
            Ok(offset) => {
                warn!(path = %self.path.display(), offset, "ignoring nonsensical stored offset");
                0.0
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read offset, assuming 0");
                0.0
            }
        }
    }

    fn save(&self, offset_sec: f64) -> Result<(), StoreError> {
        let _held = self.guard.lock().unwrap_or_else(|p| p.into_inner());
        let record = OffsetRecord { offset_sec };
        let raw = serde_json::to_string(&record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        fs::write(&self.path, raw)?;
        debug!(path = %self.path.display(), offset_sec, "saved playback offset");
        Ok(())
    }
}
