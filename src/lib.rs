pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod settings;
pub mod vision;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::sync::watch;

use clock::SystemClock;
use config::{Config, SourceKind};
use db::Database;
use models::HistoryStats;
use monitor::{MonitorController, MonitorSnapshot};
use notify::DesktopNotifier;
use settings::SettingsStore;
use vision::{JsonLinesSource, LandmarkSource, SimulatedSource};

fn build_source(config: &Config) -> Box<dyn LandmarkSource> {
    match &config.source {
        SourceKind::Simulated => {
            Box::new(SimulatedSource::new(config.fps).with_blink_gap(config.blink_gap))
        }
        SourceKind::JsonLines(input) => {
            let source = JsonLinesSource::new(input.clone());
            match input {
                // Recordings replay in real time; live pipes set their own pace.
                vision::JsonLinesInput::File(_) => Box::new(source.with_frame_rate(config.fps)),
                vision::JsonLinesInput::Stdin => Box::new(source),
            }
        }
    }
}

async fn wait_until_idle(mut snapshots: watch::Receiver<MonitorSnapshot>) {
    while snapshots.changed().await.is_ok() {
        if !snapshots.borrow().state.is_monitoring() {
            return;
        }
    }
    std::future::pending::<()>().await
}

pub async fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    info!("eyecare starting up...");
    info!("{config:?}");

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;

    let database = Database::new(config.database_path())?;
    let settings = Arc::new(SettingsStore::new(config.settings_path())?);
    let notifier = Arc::new(DesktopNotifier::new(settings.clone()));
    let controller = MonitorController::new(
        database.clone(),
        settings.clone(),
        notifier,
        Arc::new(SystemClock::new()),
    );

    let snapshots = controller.subscribe();
    controller
        .start_monitoring(build_source(&config))
        .await
        .context("could not start monitoring")?;

    let deadline = config.duration;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!("failed to listen for ctrl-c: {err}");
            }
            info!("interrupted, stopping");
        }
        _ = async {
            match deadline {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        } => {
            info!("run duration elapsed, stopping");
        }
        _ = wait_until_idle(snapshots) => {
            if let Some(err) = controller.snapshot().error {
                error!("monitoring halted: {err}");
            }
        }
    }

    controller.stop_monitoring().await?;

    let sessions = database.list_sessions().await?;
    let stats = HistoryStats::from_sessions(&sessions);
    info!(
        "history: {} sessions, {} min total, {:.1} blinks/min average, trend {:+}%",
        stats.total_sessions,
        stats.total_time_secs / 60,
        stats.average_blink_rate,
        stats.improvement_trend
    );

    Ok(())
}
