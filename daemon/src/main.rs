mod config;
mod error;
mod indicator;
mod latch;
mod media;
mod monitor;
mod paths;
mod process_monitor;
mod sampler;
mod test_support;
mod watchdog;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::indicator::{create_window, Signal};
use crate::media::{MediaCue, SystemPlayer, SystemVolume};
use crate::monitor::{LoopState, Monitor};
use crate::process_monitor::{SysinfoNetwork, SysinfoProcesses};
use crate::sampler::Sampler;
use crate::watchdog::{CommandTerminator, IdleKillWatchdog};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        error!("{e:#} (using defaults)");
        config::Config::default()
    });

    // ── Loop state ────────────────────────────────────────────────────────────
    let media = MediaCue::new(&config.media, Box::new(SystemVolume), Box::new(SystemPlayer));
    let watchdog = config.idle_kill.enabled.then(|| {
        IdleKillWatchdog::new(
            &config.idle_kill,
            config.processes.all().iter().map(|s| s.to_string()).collect(),
            Box::new(CommandTerminator::new(config.idle_kill.command.clone())),
            config.monitor.retry_backoff(),
        )
    });
    let state = LoopState::new(
        |signal: Signal| create_window(signal, &config.indicator),
        media,
        watchdog,
    );
    let sampler = Sampler::new(
        Box::new(SysinfoProcesses::new()),
        Box::new(SysinfoNetwork::new()),
        config.monitor.traffic_window(),
        config.monitor.traffic_threshold_bytes,
    );
    let mut monitor = Monitor::new(&config, state, sampler);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        idle_kill = config.idle_kill.enabled,
        cadence = ?config.effective_poll_interval(),
        "status-prompter started"
    );

    // ── Monitor loop ──────────────────────────────────────────────────────────
    // Ctrl+C is the only way out; without a signal handler the loop runs until killed.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = monitor.run() => {}
        _ = shutdown => {}
    }

    info!("shutting down");
    monitor.release();
}
