//! The crate's error taxonomy.
//!
//! None of these are fatal to the engine: schedule failures are retried with
//! backoff, playback failures skip the event, and store failures degrade to
//! "no prior offset". The only hard exit path is an operator interrupt.

use std::path::PathBuf;
use thiserror::Error;

/// The upstream schedule could not be fetched or understood.
///
/// Recovered locally by retry: every 60 s while the engine has no schedule
/// yet, and with a 5-minute deferral on a failed periodic refresh.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("schedule source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        SourceError::Unavailable(err.to_string())
    }
}

/// An audio resource could not be played. Logged and skipped; the engine
/// tick continues.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("missing audio file: {0}")]
    MissingResource(PathBuf),
    #[error("could not determine duration of {0}")]
    UnknownDuration(PathBuf),
    #[error("audio device error: {0}")]
    Device(String),
}

/// The durable offset record could not be read or written.
///
/// A read failure is treated as "assume zero offset"; a write failure is
/// logged and ignored.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("offset store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("offset store record is corrupt: {0}")]
    Corrupt(String),
}
