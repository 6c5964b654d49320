//! The core engine that orchestrates the entire Athan Pi system.
//!
//! One sequential loop drives every scheduling decision: it refreshes the
//! day's schedule when the refresh policy says so, fires due events exactly
//! once per schedule generation, and hands looping segments off to a
//! spawned [`SegmentPlayer`] so audio never blocks the poll cadence.

use crate::components::audio::AudioSink;
use crate::components::player::SegmentPlayer;
use crate::components::store::{JsonFileOffsetStore, OffsetStore};
use crate::config::AthanConfig;
use crate::errors::SourceError;
use crate::events::{EventKind, FiredKey, OperatorCommand, RefreshSignal, ScheduleEvent};
use crate::notify::{LogNotifier, Notifier, NtfyNotifier};
use crate::schedule::{build_schedule, RefreshState};
use crate::source::ScheduleSource;
use crate::{ENGINE_NAME, VERSION};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Supplies current wall-clock time in the deployment timezone.
/// Abstracted so the engine's scheduling decisions are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// The real clock.
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Retry interval while the engine has no schedule at all.
const INITIAL_RETRY: Duration = Duration::from_secs(60);
/// Deferral after a failed periodic refresh.
const REFRESH_BACKOFF: Duration = Duration::from_secs(300);

/// The mutable scheduling state owned by the engine loop.
#[derive(Default)]
struct EngineState {
    /// The current schedule generation, sorted ascending by fire time.
    schedule: Vec<ScheduleEvent>,
    /// Events already fired in this generation. Cleared in full on every
    /// successful rebuild, so stale keys can never suppress a new day's
    /// events.
    fired: HashSet<FiredKey>,
    refresh: RefreshState,
}

/// The main Athan Pi engine.
///
/// Cheap to clone; all collaborators sit behind `Arc`s. The loop itself is
/// started once with [`run`](AthanEngine::run).
#[derive(Clone)]
pub struct AthanEngine {
    config: Arc<AthanConfig>,
    source: Arc<dyn ScheduleSource>,
    sink: Arc<dyn AudioSink>,
    store: Arc<dyn OffsetStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,

    /// Fire-and-forget broadcast toward any listening UI.
    refresh_sender: broadcast::Sender<RefreshSignal>,
    /// Cooperative stop signal for in-flight segment sessions.
    stop_sender: broadcast::Sender<()>,

    command_sender: mpsc::Sender<OperatorCommand>,
    command_receiver: Arc<Mutex<Option<mpsc::Receiver<OperatorCommand>>>>,
}

impl AthanEngine {
    /// Creates an engine with the default store, notifier, and clock
    /// derived from `config`.
    pub fn new(
        config: AthanConfig,
        source: Arc<dyn ScheduleSource>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let store = Arc::new(JsonFileOffsetStore::new(config.preclip.state_path.clone()));
        let notifier: Arc<dyn Notifier> = match &config.ntfy_topic {
            Some(topic) => Arc::new(NtfyNotifier::new(topic.clone())),
            None => Arc::new(LogNotifier),
        };
        let clock = Arc::new(SystemClock::new(config.timezone));
        Self::with_parts(config, source, sink, store, notifier, clock)
    }

    /// Creates an engine with every collaborator injected.
    pub fn with_parts(
        config: AthanConfig,
        source: Arc<dyn ScheduleSource>,
        sink: Arc<dyn AudioSink>,
        store: Arc<dyn OffsetStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (refresh_sender, _) = broadcast::channel(64);
        let (stop_sender, _) = broadcast::channel(8);
        let (command_sender, command_receiver) = mpsc::channel(16);
        Self {
            config: Arc::new(config),
            source,
            sink,
            store,
            notifier,
            clock,
            refresh_sender,
            stop_sender,
            command_sender,
            command_receiver: Arc::new(Mutex::new(Some(command_receiver))),
        }
    }

    /// A sender for manual operator commands. Commands are applied between
    /// ticks and never block the loop.
    pub fn command_sender(&self) -> mpsc::Sender<OperatorCommand> {
        self.command_sender.clone()
    }

    /// Subscribes to the UI refresh-signal stream.
    pub fn subscribe_refresh_signals(&self) -> broadcast::Receiver<RefreshSignal> {
        self.refresh_sender.subscribe()
    }

    /// Runs the engine until a shutdown signal (Ctrl+C) is received.
    ///
    /// The loop starts in an initializing state: it retries the first
    /// schedule build every 60 s indefinitely, because a working schedule
    /// is mandatory to proceed usefully, but a transient fetch failure must
    /// never exit the process.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("{} v{} starting up...", ENGINE_NAME, VERSION);
        let commands = self
            .command_receiver
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .ok_or_else(|| anyhow::anyhow!("engine is already running"))?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let worker = self.clone();
        tokio::spawn(worker.engine_loop(commands, shutdown_tx.subscribe()));

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received. Stopping engine...");
        shutdown_tx.send(()).ok();
        self.stop_sender.send(()).ok();
        self.sink.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        info!("{} has shut down.", ENGINE_NAME);
        Ok(())
    }

    /// Initializing -> Polling state machine.
    async fn engine_loop(
        self,
        mut commands: mpsc::Receiver<OperatorCommand>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut state = EngineState::default();

        // Initializing: stay here until the first build succeeds.
        loop {
            match self.build_today().await {
                Ok(events) => {
                    self.install_schedule(&mut state, events);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "initial schedule fetch failed; retrying in 60s");
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => return,
                        _ = tokio::time::sleep(INITIAL_RETRY) => {}
                    }
                }
            }
        }

        // Polling: steady state.
        loop {
            let pause = self.tick(&mut state).await;
            tokio::select! {
                biased;
                _ = shutdown.recv() => return,
                Some(cmd) = commands.recv() => self.handle_command(cmd),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// One steady-state tick. Returns how long to sleep before the next
    /// one: the poll interval normally, an extended backoff after a failed
    /// refresh.
    async fn tick(&self, state: &mut EngineState) -> Duration {
        let now = self.now_local();

        if state.refresh.should_refresh(now) {
            match self.build_today().await {
                Ok(events) => self.install_schedule(state, events),
                Err(e) => {
                    warn!(error = %e, "schedule refresh failed; will retry in 5 minutes");
                    return REFRESH_BACKOFF;
                }
            }
        }

        let window = self.config.trigger_window_secs as i64;
        for event in state.schedule.iter() {
            let key = event.key();
            if state.fired.contains(&key) {
                continue;
            }
            if now < event.fire_at {
                continue;
            }
            let diff = (now - event.fire_at).num_seconds();
            if diff < window {
                info!(
                    label = %event.label,
                    at = %event.fire_at.format("%I:%M %p"),
                    "event time reached"
                );
                self.dispatch(event);
                state.fired.insert(key);
            }
            // A window that fully elapsed while the engine was not running
            // is dropped: announcements are never fired late.
        }

        state.refresh.reconcile(now);
        self.config.poll_interval()
    }

    fn now_local(&self) -> NaiveDateTime {
        self.clock.now().naive_local()
    }

    async fn build_today(&self) -> Result<Vec<ScheduleEvent>, SourceError> {
        let source = self.source.clone();
        let times = tokio::task::spawn_blocking(move || source.fetch_today())
            .await
            .map_err(SourceError::unavailable)??;
        let today = self.clock.now().date_naive();
        Ok(build_schedule(&times, today, &self.config))
    }

    /// Installs a freshly built generation, clearing the fired-set with it.
    fn install_schedule(&self, state: &mut EngineState, events: Vec<ScheduleEvent>) {
        info!("Today's events:");
        for event in &events {
            info!("  - {}: {}", event.label, event.fire_at.format("%I:%M %p"));
        }
        state.schedule = events;
        state.fired.clear();
        state.refresh.mark_refreshed(self.now_local());
    }

    /// Fires one due event: dispatch by kind, best-effort notification,
    /// best-effort UI refresh signal.
    fn dispatch(&self, event: &ScheduleEvent) {
        match event.kind {
            EventKind::SimplePlay => {
                let Some(path) = &event.payload else {
                    warn!(label = %event.label, "event has no payload, skipping");
                    return;
                };
                match self.sink.play(path) {
                    Ok(()) => {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        self.notify(format!("Now playing: {name}"));
                    }
                    Err(e) => warn!(
                        label = %event.label,
                        path = %path.display(),
                        error = %e,
                        "playback skipped"
                    ),
                }
            }
            EventKind::LoopingSegment => self.start_segment_session(),
        }

        self.refresh_sender
            .send(RefreshSignal {
                message: format!("{} time reached", event.label),
            })
            .ok();
    }

    /// Spawns one fire-and-forget segment session.
    fn start_segment_session(&self) {
        let window = Duration::from_secs(self.config.preclip.window_secs);
        let player = SegmentPlayer::new(
            self.sink.clone(),
            self.store.clone(),
            self.config.sounds.daily_quran.clone(),
            window,
        );
        tokio::spawn(player.run(self.stop_sender.subscribe()));
        self.notify(format!(
            "Now playing looping Quran preclip for {} minutes",
            window.as_secs() / 60
        ));
    }

    fn notify(&self, message: String) {
        let notifier = self.notifier.clone();
        tokio::task::spawn_blocking(move || notifier.send(ENGINE_NAME, &message));
    }

    fn handle_command(&self, cmd: OperatorCommand) {
        match cmd {
            OperatorCommand::TestShortPlay => {
                info!("operator: short test playback");
                if let Err(e) = self.sink.play(&self.config.sounds.short) {
                    warn!(error = %e, "test playback failed");
                }
            }
            OperatorCommand::TestPreclipSegment => {
                info!("operator: test segment session");
                self.start_segment_session();
            }
            OperatorCommand::ResetOffset => {
                match self.store.save(0.0) {
                    Ok(()) => info!("operator: segment offset reset to 0s"),
                    Err(e) => warn!(error = %e, "offset reset failed"),
                }
            }
            OperatorCommand::StopAll => {
                info!("operator: stop requested; halting audio");
                self.stop_sender.send(()).ok();
                self.sink.stop();
            }
        }
    }
}
