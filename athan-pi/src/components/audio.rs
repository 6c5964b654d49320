//! The audio transport edge.
//!
//! The engine only ever talks to [`AudioSink`]; the default backend,
//! [`RodioSink`], runs the rodio output stream on a dedicated thread fed by
//! a command channel, because the underlying device stream is not `Send`
//! and must never sit on the engine's async tasks.

use crate::errors::PlaybackError;
use lofty::prelude::AudioFile;
use lofty::probe::Probe;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// The audio transport the engine dispatches to.
///
/// Playback starts asynchronously: a successful return means the transport
/// accepted the clip, not that it finished. Starting a clip stops whatever
/// was playing before it. `stop` is best-effort; audio already buffered in
/// the device is not guaranteed to cut out instantly.
pub trait AudioSink: Send + Sync {
    /// Plays a clip from the beginning.
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        self.play_from(path, Duration::ZERO)
    }

    /// Plays a clip starting `start_at` into the resource.
    fn play_from(&self, path: &Path, start_at: Duration) -> Result<(), PlaybackError>;

    /// Halts the current transport, best-effort.
    fn stop(&self);

    /// Total duration of the resource, probed from its metadata.
    fn clip_duration(&self, path: &Path) -> Result<Duration, PlaybackError>;
}

enum TransportCommand {
    Play { path: PathBuf, start_at: Duration },
    Stop,
}

/// Rodio-backed [`AudioSink`]. One long-lived transport thread owns the
/// output stream; the handle is cheap to clone across engine tasks.
pub struct RodioSink {
    tx: mpsc::UnboundedSender<TransportCommand>,
}

impl RodioSink {
    /// Spawns the transport thread and returns a handle to it. If no audio
    /// device is available the thread logs the failure and playback
    /// commands become no-ops; the engine keeps running regardless.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = std::thread::Builder::new()
            .name("audio-transport".to_string())
            .spawn(move || transport_loop(rx))
        {
            error!(error = %e, "could not spawn audio transport thread");
        }
        Self { tx }
    }
}

impl AudioSink for RodioSink {
    fn play_from(&self, path: &Path, start_at: Duration) -> Result<(), PlaybackError> {
        if !path.exists() {
            return Err(PlaybackError::MissingResource(path.to_path_buf()));
        }
        self.tx
            .send(TransportCommand::Play {
                path: path.to_path_buf(),
                start_at,
            })
            .map_err(|_| PlaybackError::Device("audio transport thread gone".to_string()))
    }

    fn stop(&self) {
        self.tx.send(TransportCommand::Stop).ok();
    }

    fn clip_duration(&self, path: &Path) -> Result<Duration, PlaybackError> {
        if !path.exists() {
            return Err(PlaybackError::MissingResource(path.to_path_buf()));
        }
        let tagged = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(|_| PlaybackError::UnknownDuration(path.to_path_buf()))?;
        let duration = tagged.properties().duration();
        if duration.is_zero() {
            return Err(PlaybackError::UnknownDuration(path.to_path_buf()));
        }
        Ok(duration)
    }
}

fn transport_loop(mut rx: mpsc::UnboundedReceiver<TransportCommand>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "no audio output device; playback commands will be ignored");
            while rx.blocking_recv().is_some() {}
            return;
        }
    };

    let mut current: Option<Sink> = None;
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            TransportCommand::Play { path, start_at } => {
                if let Some(sink) = current.take() {
                    sink.stop();
                }
                match start_clip(&handle, &path, start_at) {
                    Ok(sink) => {
                        info!(path = %path.display(), start_at_sec = start_at.as_secs(), "playing");
                        current = Some(sink);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to start clip"),
                }
            }
            TransportCommand::Stop => {
                if let Some(sink) = current.take() {
                    sink.stop();
                }
            }
        }
    }
}

fn start_clip(
    handle: &OutputStreamHandle,
    path: &Path,
    start_at: Duration,
) -> Result<Sink, PlaybackError> {
    let file = File::open(path).map_err(|e| PlaybackError::Device(e.to_string()))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| PlaybackError::Device(e.to_string()))?;
    let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
    if start_at.is_zero() {
        sink.append(source);
    } else {
        sink.append(source.skip_duration(start_at));
    }
    Ok(sink)
}
