use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    config,
    db::Database,
    error::{DetectorError, MonitorError, MonitorResult},
    models::SessionRecord,
    notify::{Alert, Notifier},
    settings::SettingsStore,
    vision::{landmarks::LandmarkFrame, source::FrameResult, LandmarkSource},
};

use super::engine::{FrameOutcome, MonitorEngine};
use super::state::SessionState;

/// What presentation collaborators see between mutations.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub state: SessionState,
    pub current_ear: Option<f64>,
    /// Last detector failure, cleared by the next successful start.
    pub error: Option<String>,
}

#[derive(Default)]
struct SessionTasks {
    cancel_token: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
    source: Option<Box<dyn LandmarkSource>>,
}

#[derive(Clone)]
pub struct MonitorController {
    engine: Arc<Mutex<MonitorEngine>>,
    db: Database,
    settings: Arc<SettingsStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    tasks: Arc<Mutex<SessionTasks>>,
    snapshot_tx: Arc<watch::Sender<MonitorSnapshot>>,
    tick_interval: Option<Duration>,
    heartbeat_every_ticks: u32,
    ticks: Arc<AtomicU32>,
}

impl MonitorController {
    pub fn new(
        db: Database,
        settings: Arc<SettingsStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(MonitorSnapshot::default());

        Self {
            engine: Arc::new(Mutex::new(MonitorEngine::new())),
            db,
            settings,
            notifier,
            clock,
            tasks: Arc::new(Mutex::new(SessionTasks::default())),
            snapshot_tx: Arc::new(snapshot_tx),
            tick_interval: Some(Duration::from_secs(1)),
            heartbeat_every_ticks: if config::debug_mode() { 1 } else { 10 },
            ticks: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Drive time through [`handle_tick`](Self::handle_tick) by hand instead
    /// of a background ticker.
    pub fn with_manual_ticks(mut self) -> Self {
        self.tick_interval = None;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    pub async fn is_monitoring(&self) -> bool {
        self.engine.lock().await.is_monitoring()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Start a fresh session fed by `source`. A running session is stopped
    /// (and persisted) first.
    ///
    /// If the source fails to start, the failure is recorded in the
    /// snapshot, the session stays idle and the error is returned.
    pub async fn start_monitoring(&self, mut source: Box<dyn LandmarkSource>) -> MonitorResult<SessionState> {
        if self.is_monitoring().await {
            info!("restarting monitoring; closing the current session first");
            self.stop_monitoring().await?;
        }

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        if let Err(err) = source.start(frame_tx) {
            error!("landmark source '{}' failed to start: {err}", source.name());
            source.dispose();
            self.record_error(&err);
            return Err(err.into());
        }

        let settings = self.settings.current();
        let state = {
            let mut engine = self.engine.lock().await;
            engine.start(self.clock.now_ms(), self.clock.wall(), &settings);
            self.publish(&engine, true);
            engine.state().clone()
        };
        self.ticks.store(0, Ordering::Relaxed);

        let cancel_token = CancellationToken::new();
        let mut handles = vec![tokio::spawn(consume_frames(
            self.clone(),
            frame_rx,
            cancel_token.clone(),
        ))];
        if let Some(period) = self.tick_interval {
            handles.push(tokio::spawn(run_ticker(self.clone(), period, cancel_token.clone())));
        }

        {
            let mut tasks = self.tasks.lock().await;
            tasks.cancel_token = Some(cancel_token);
            tasks.handles = handles;
            tasks.source = Some(source);
        }

        info!(
            "monitoring started (threshold {:.2}, break every {}s)",
            settings.blink_threshold, settings.break_interval_secs
        );
        Ok(state)
    }

    /// Stop the session, halt ticking and frame consumption, and persist
    /// the record when the session was long enough. Idempotent.
    pub async fn stop_monitoring(&self) -> MonitorResult<Option<SessionRecord>> {
        let settings = self.settings.current();
        let record = {
            let mut engine = self.engine.lock().await;
            let was_running = engine.is_monitoring();
            let record = engine.stop(self.clock.wall(), &settings);
            if was_running {
                self.publish(&engine, false);
            }
            record
        };

        self.shutdown_tasks().await;

        match &record {
            Some(record) => {
                self.db
                    .add_session(record)
                    .await
                    .map_err(MonitorError::Persistence)?;
                info!(
                    "session {} saved: {}s, {} blinks, {:.1}/min avg, strain {}",
                    record.id,
                    record.duration_secs,
                    record.total_blinks,
                    record.average_blink_rate,
                    record.eye_strain_level.as_str()
                );
            }
            None => debug!("stop_monitoring: nothing to persist"),
        }

        Ok(record)
    }

    /// One second of session time.
    pub async fn handle_tick(&self) -> Vec<Alert> {
        let settings = self.settings.current();
        let now_ms = self.clock.now_ms();

        let (alerts, state) = {
            let mut engine = self.engine.lock().await;
            if !engine.is_monitoring() {
                return Vec::new();
            }
            let alerts = engine.tick(now_ms, &settings);
            self.publish(&engine, false);
            (alerts, engine.state().clone())
        };

        for alert in &alerts {
            alert.dispatch(self.notifier.as_ref());
        }

        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if ticks % self.heartbeat_every_ticks.max(1) == 0 {
            info!(
                "heartbeat: {}s, {} blinks, {}/min, strain {}",
                state.session_secs,
                state.total_blinks,
                state.blink_rate,
                state.strain_level.as_str()
            );
        }

        alerts
    }

    /// Feed one landmark frame. Frames arriving while idle are ignored.
    pub async fn handle_frame(&self, frame: &LandmarkFrame) -> FrameOutcome {
        let settings = self.settings.current();
        let now_ms = self.clock.now_ms();

        let outcome = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.process_frame(frame, now_ms, &settings);
            if engine.is_monitoring() {
                self.publish(&engine, false);
            }
            outcome
        };

        if outcome.blink {
            debug!("blink confirmed at {now_ms}ms");
        }
        if let Some(alert) = &outcome.alert {
            alert.dispatch(self.notifier.as_ref());
        }
        outcome
    }

    /// Mark an eye exercise done and celebrate it. Returns false when the
    /// exercise had already been completed before.
    pub async fn complete_exercise(&self, exercise_id: &str, name: &str) -> Result<bool> {
        let newly_completed = self
            .db
            .mark_exercise_completed(exercise_id, self.clock.wall())
            .await?;

        Alert::ExerciseComplete {
            name: name.to_string(),
        }
        .dispatch(self.notifier.as_ref());

        Ok(newly_completed)
    }

    async fn halt_on_error(&self, err: DetectorError) {
        error!("landmark stream failed, stopping monitoring: {err}");
        self.record_error(&err);
        if let Err(stop_err) = self.stop_monitoring().await {
            error!("failed to stop monitoring after detector failure: {stop_err}");
        }
    }

    async fn shutdown_tasks(&self) {
        let (cancel_token, handles, source) = {
            let mut tasks = self.tasks.lock().await;
            (
                tasks.cancel_token.take(),
                std::mem::take(&mut tasks.handles),
                tasks.source.take(),
            )
        };

        if let Some(token) = cancel_token {
            token.cancel();
        }

        if let Some(mut source) = source {
            source.stop();
            source.dispose();
            info!("landmark source '{}' released", source.name());
        }

        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("monitor task failed to join: {err}");
                }
            }
        }
    }

    fn record_error(&self, err: &DetectorError) {
        let message = err.to_string();
        self.snapshot_tx.send_modify(|snapshot| snapshot.error = Some(message));
    }

    fn publish(&self, engine: &MonitorEngine, clear_error: bool) {
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.state = engine.state().clone();
            snapshot.current_ear = engine.last_ear();
            if clear_error {
                snapshot.error = None;
            }
        });
    }
}

async fn consume_frames(
    controller: MonitorController,
    mut frames: mpsc::UnboundedReceiver<FrameResult>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            next = frames.recv() => match next {
                Some(Ok(frame)) => {
                    controller.handle_frame(&frame).await;
                }
                Some(Err(err)) => {
                    // Stopping joins this task, so hand off to a fresh one.
                    let halting = controller.clone();
                    tokio::spawn(async move { halting.halt_on_error(err).await });
                    break;
                }
                None => {
                    info!("landmark source closed its stream");
                    break;
                }
            },
            _ = cancel_token.cancelled() => break,
        }
    }
    debug!("frame consumer exiting");
}

async fn run_ticker(controller: MonitorController, period: Duration, cancel_token: CancellationToken) {
    // The first tick lands one full period after start.
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !controller.is_monitoring().await {
                    break;
                }
                controller.handle_tick().await;
            }
            _ = cancel_token.cancelled() => break,
        }
    }
    debug!("ticker exiting");
}
