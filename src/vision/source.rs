//! Landmark-detector collaborators.
//!
//! A source pushes frames onto an unbounded channel that exactly one
//! consumer drains. Start-up failures come back from `start`; failures
//! after that travel down the channel as `Err` so the consumer can halt.

use std::io::ErrorKind;
use std::path::PathBuf;

use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::DetectorError;

use super::landmarks::{
    LandmarkFrame, Point, FACE_MESH_POINTS, LEFT_EYE_EAR_POINTS, RIGHT_EYE_EAR_POINTS,
};

pub type FrameResult = Result<LandmarkFrame, DetectorError>;
pub type FrameSender = UnboundedSender<FrameResult>;

pub trait LandmarkSource: Send {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Begin delivering frames. Must be called inside a tokio runtime.
    fn start(&mut self, frames: FrameSender) -> Result<(), DetectorError>;

    /// Stop delivering frames. Safe to call repeatedly.
    fn stop(&mut self);

    /// Release everything the source holds. The source cannot be restarted.
    fn dispose(&mut self) {
        self.stop();
    }
}

/// Cancellation handle shared by the task-backed sources.
#[derive(Default)]
struct Worker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Worker {
    fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    fn spawn<F, Fut>(&mut self, run: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run(cancel_token.clone()));
        self.cancel_token = Some(cancel_token);
        self.handle = Some(handle);
    }

    fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        // The task exits at its next select point; nothing to join.
        self.handle.take();
    }
}

/// Canonical open-eye geometry used by [`synthetic_frame`].
const EYE_WIDTH: f64 = 0.1;

/// A 468-point frame whose two eye contours both measure `ear`.
pub fn synthetic_frame(ear: f64) -> LandmarkFrame {
    let mut points = vec![Point::new(0.5, 0.5); FACE_MESH_POINTS];
    place_eye(&mut points, &LEFT_EYE_EAR_POINTS, 0.30, 0.40, ear);
    place_eye(&mut points, &RIGHT_EYE_EAR_POINTS, 0.60, 0.40, ear);
    LandmarkFrame::new(points)
}

fn place_eye(points: &mut [Point], indices: &[usize; 6], left_x: f64, y: f64, ear: f64) {
    let half_open = ear * EYE_WIDTH / 2.0;
    let third = EYE_WIDTH / 3.0;
    let [corner_a, upper_a, upper_b, corner_b, lower_b, lower_a] = *indices;

    points[corner_a] = Point::new(left_x, y);
    points[corner_b] = Point::new(left_x + EYE_WIDTH, y);
    points[upper_a] = Point::new(left_x + third, y - half_open);
    points[lower_a] = Point::new(left_x + third, y + half_open);
    points[upper_b] = Point::new(left_x + 2.0 * third, y - half_open);
    points[lower_b] = Point::new(left_x + 2.0 * third, y + half_open);
}

const SIMULATED_OPEN_EAR: f64 = 0.30;
const SIMULATED_CLOSED_EAR: f64 = 0.12;
const SIMULATED_BLINK_FRAMES: u32 = 4;

/// Time between frames at `fps`, never shorter than a millisecond.
pub fn frame_period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1))).max(Duration::from_millis(1))
}

/// Synthetic face that blinks every few seconds. Used for demos and when
/// no real detector is wired up.
pub struct SimulatedSource {
    fps: u32,
    mean_blink_gap: Duration,
    seed: Option<u64>,
    worker: Worker,
}

impl SimulatedSource {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            mean_blink_gap: Duration::from_secs(4),
            seed: None,
            worker: Worker::default(),
        }
    }

    pub fn with_blink_gap(mut self, gap: Duration) -> Self {
        self.mean_blink_gap = gap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(30)
    }
}

impl LandmarkSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn start(&mut self, frames: FrameSender) -> Result<(), DetectorError> {
        if self.worker.is_running() {
            return Err(DetectorError::initialization("simulated source already running"));
        }

        let frame_interval = frame_period(self.fps);
        let gap_frames = (self.mean_blink_gap.as_nanos() / frame_interval.as_nanos()).max(1) as u64;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "simulated landmark source starting at {} fps, blink roughly every {:?}",
            self.fps, self.mean_blink_gap
        );
        self.worker
            .spawn(|token| simulate(frames, frame_interval, gap_frames, rng, token));
        Ok(())
    }

    fn stop(&mut self) {
        self.worker.stop();
    }
}

async fn simulate(
    frames: FrameSender,
    frame_interval: Duration,
    gap_frames: u64,
    mut rng: StdRng,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut until_blink = next_gap(&mut rng, gap_frames);
    let mut closed_left = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ear = if closed_left > 0 {
                    closed_left -= 1;
                    SIMULATED_CLOSED_EAR
                } else if until_blink == 0 {
                    closed_left = SIMULATED_BLINK_FRAMES - 1;
                    until_blink = next_gap(&mut rng, gap_frames);
                    SIMULATED_CLOSED_EAR
                } else {
                    until_blink -= 1;
                    SIMULATED_OPEN_EAR + rng.gen_range(-0.02..0.02)
                };

                if frames.send(Ok(synthetic_frame(ear))).is_err() {
                    debug!("simulated source receiver dropped");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                info!("simulated landmark source shutting down");
                break;
            }
        }
    }
}

fn next_gap(rng: &mut StdRng, mean: u64) -> u64 {
    let spread = (mean / 2).max(1);
    rng.gen_range(mean.saturating_sub(spread)..=mean + spread)
}

/// Where a [`JsonLinesSource`] reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonLinesInput {
    Stdin,
    File(PathBuf),
}

impl JsonLinesInput {
    /// `-` selects stdin, anything else is a file path.
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            JsonLinesInput::Stdin
        } else {
            JsonLinesInput::File(PathBuf::from(value))
        }
    }
}

/// Frames recorded or piped from an external face-mesh detector, one JSON
/// array of `{x, y, z}` points per line.
pub struct JsonLinesSource {
    input: JsonLinesInput,
    frame_interval: Option<Duration>,
    worker: Worker,
}

impl JsonLinesSource {
    pub fn new(input: JsonLinesInput) -> Self {
        Self {
            input,
            frame_interval: None,
            worker: Worker::default(),
        }
    }

    /// Replay at a fixed rate instead of as fast as lines arrive.
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_interval = Some(frame_period(fps));
        self
    }

    fn open(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>, DetectorError> {
        match &self.input {
            JsonLinesInput::Stdin => Ok(Box::new(tokio::io::stdin())),
            JsonLinesInput::File(path) => {
                let file = std::fs::File::open(path).map_err(|err| {
                    let message = format!("{}: {err}", path.display());
                    if err.kind() == ErrorKind::PermissionDenied {
                        DetectorError::permission_denied(message)
                    } else {
                        DetectorError::initialization(message)
                    }
                })?;
                Ok(Box::new(tokio::fs::File::from_std(file)))
            }
        }
    }
}

impl LandmarkSource for JsonLinesSource {
    fn name(&self) -> &str {
        match self.input {
            JsonLinesInput::Stdin => "stdin",
            JsonLinesInput::File(_) => "json-lines file",
        }
    }

    fn start(&mut self, frames: FrameSender) -> Result<(), DetectorError> {
        if self.worker.is_running() {
            return Err(DetectorError::initialization("landmark stream already running"));
        }

        let reader = self.open()?;
        let frame_interval = self.frame_interval;
        info!("reading landmark frames from {:?}", self.input);
        self.worker
            .spawn(|token| read_lines(reader, frames, frame_interval, token));
        Ok(())
    }

    fn stop(&mut self) {
        self.worker.stop();
    }
}

async fn read_lines(
    reader: Box<dyn AsyncRead + Send + Unpin>,
    frames: FrameSender,
    frame_interval: Option<Duration>,
    cancel_token: CancellationToken,
) {
    let mut lines = BufReader::new(reader).lines();
    let mut pacer = frame_interval.map(|period| {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    let mut line_no: u64 = 0;

    loop {
        if let Some(pacer) = pacer.as_mut() {
            tokio::select! {
                _ = pacer.tick() => {}
                _ = cancel_token.cancelled() => break,
            }
        }

        let next = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel_token.cancelled() => break,
        };

        line_no += 1;
        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("landmark stream ended after {} lines", line_no - 1);
                break;
            }
            Err(err) => {
                let _ = frames.send(Err(DetectorError::stream(err.to_string())));
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<LandmarkFrame>(&line) {
            Ok(frame) => {
                if frames.send(Ok(frame)).is_err() {
                    break;
                }
            }
            // A malformed frame is the same as a frame without a face.
            Err(err) => warn!("skipping malformed landmark line {line_no}: {err}"),
        }
    }
}
