use anyhow::Result;
use athan_pi::prelude::*;
use athan_pi::ENGINE_NAME;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("{} daemon starting...", ENGINE_NAME);

    // 2. Load configuration (athand.toml if present, defaults otherwise).
    let config = AthanConfig::load()?;
    for path in config.all_sound_paths() {
        if !path.exists() {
            warn!(path = %path.display(), "configured sound file not found");
        }
    }

    // 3. Wire the engine to its real collaborators.
    let source = Arc::new(HttpScheduleSource::new(config.source.clone()));
    let sink = Arc::new(RodioSink::spawn());
    let engine = AthanEngine::new(config, source, sink);

    // 4. Log UI refresh signals so firings are visible in the daemon log.
    let mut signals = engine.subscribe_refresh_signals();
    tokio::spawn(async move {
        while let Ok(signal) = signals.recv().await {
            info!(message = %signal.message, "refresh signal broadcast");
        }
    });

    // 5. Accept manual operator commands on stdin.
    tokio::spawn(operator_watcher(engine.command_sender()));

    // 6. Run the engine. Returns on Ctrl+C.
    engine.run().await?;

    Ok(())
}

/// Reads operator commands from stdin, one per line:
/// Enter = short test, `q` = segment test, `r` = reset offset,
/// `esc` = stop all audio.
async fn operator_watcher(commands: mpsc::Sender<OperatorCommand>) {
    info!("Controls: Enter = short test, Q = segment test, R = reset offset, Esc = stop");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim().to_lowercase().as_str() {
            "" => OperatorCommand::TestShortPlay,
            "q" => OperatorCommand::TestPreclipSegment,
            "r" => OperatorCommand::ResetOffset,
            "esc" => OperatorCommand::StopAll,
            other => {
                warn!(input = other, "unknown operator command");
                continue;
            }
        };
        if commands.send(command).await.is_err() {
            break;
        }
    }
}
