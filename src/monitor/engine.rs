use chrono::{DateTime, Utc};

use crate::models::SessionRecord;
use crate::notify::Alert;
use crate::settings::UserSettings;
use crate::vision::{
    blink::BlinkDetector,
    ear::eye_aspect_ratio,
    landmarks::{extract_eye_contours, LandmarkFrame},
};

use super::state::SessionState;
use super::throttle::NotificationThrottle;

/// Result of feeding one landmark frame through the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub blink: bool,
    /// Averaged EAR of both eyes, `None` for frames without a usable face.
    pub ear: Option<f64>,
    pub alert: Option<Alert>,
}

/// Synchronous core tying the blink detector to the session state.
///
/// Every method is O(1) in the frame size and never blocks; the async
/// controller serialises calls behind a single lock.
#[derive(Debug, Clone, Default)]
pub struct MonitorEngine {
    state: SessionState,
    detector: BlinkDetector,
    throttle: NotificationThrottle,
    last_ear: Option<f64>,
}

impl MonitorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn detector(&self) -> &BlinkDetector {
        &self.detector
    }

    pub fn last_ear(&self) -> Option<f64> {
        self.last_ear
    }

    pub fn is_monitoring(&self) -> bool {
        self.state.is_monitoring()
    }

    /// Begin a fresh session. The detector is reset so no history leaks
    /// across sessions, and picks up the configured threshold.
    pub fn start(&mut self, now_ms: u64, wall: DateTime<Utc>, settings: &UserSettings) {
        self.detector.reset();
        self.detector.set_threshold(settings.blink_threshold);
        self.last_ear = None;
        self.state.begin_session(now_ms, wall);
    }

    pub fn stop(&mut self, wall: DateTime<Utc>, settings: &UserSettings) -> Option<SessionRecord> {
        self.state.stop(wall, settings.break_interval_secs)
    }

    /// Once-per-second driver: advances session time, then refreshes the
    /// blink rate so it decays even when no new blinks arrive.
    pub fn tick(&mut self, now_ms: u64, settings: &UserSettings) -> Vec<Alert> {
        if !self.state.is_monitoring() {
            return Vec::new();
        }

        let mut alerts = self.state.tick(now_ms, settings);

        self.detector.prune(now_ms);
        let rate = self.detector.rate(now_ms);
        if let Some(alert) = self.state.update_rate(rate, now_ms, settings, &self.throttle) {
            alerts.push(alert);
        }
        alerts
    }

    /// Per-frame driver. Frames that arrive while idle are dropped.
    /// The blink rate is refreshed on every frame with a visible face.
    pub fn process_frame(&mut self, frame: &LandmarkFrame, now_ms: u64, settings: &UserSettings) -> FrameOutcome {
        if !self.state.is_monitoring() {
            return FrameOutcome::default();
        }

        let contours = extract_eye_contours(frame);
        if !contours.is_complete() {
            return FrameOutcome::default();
        }

        let left = eye_aspect_ratio(&contours.left);
        let right = eye_aspect_ratio(&contours.right);
        let ear = (left + right) / 2.0;
        self.last_ear = Some(ear);

        let blink = self.detector.observe(left, right, now_ms);
        if blink {
            self.state.record_blink();
        }

        // Strain and warnings are re-derived whenever the rate moves, so a
        // blink aging out of the window is seen without waiting for a tick.
        let rate = self.detector.rate(now_ms);
        let mut alert = None;
        if blink || rate != self.state.blink_rate {
            alert = self.state.update_rate(rate, now_ms, settings, &self.throttle);
        }

        FrameOutcome {
            blink,
            ear: Some(ear),
            alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::strain::StrainLevel;
    use crate::vision::source::synthetic_frame;

    const FRAME_MS: u64 = 33;

    fn quiet_settings() -> UserSettings {
        UserSettings {
            nudges_enabled: false,
            ..UserSettings::default()
        }
    }

    /// Three open frames, three closed, one open. Returns every alert raised.
    fn blink_at(engine: &mut MonitorEngine, start_ms: u64, settings: &UserSettings) -> Vec<Alert> {
        let ears = [0.30, 0.30, 0.30, 0.10, 0.10, 0.10, 0.30];
        ears.iter()
            .enumerate()
            .filter_map(|(i, &ear)| {
                engine
                    .process_frame(&synthetic_frame(ear), start_ms + i as u64 * FRAME_MS, settings)
                    .alert
            })
            .collect()
    }

    #[test]
    fn test_frames_ignored_while_idle() {
        let mut engine = MonitorEngine::new();
        let outcome = engine.process_frame(&synthetic_frame(0.3), 0, &quiet_settings());
        assert_eq!(outcome, FrameOutcome::default());
        assert_eq!(engine.last_ear(), None);
    }

    #[test]
    fn test_frame_reports_ear_and_counts_blinks() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);

        let outcome = engine.process_frame(&synthetic_frame(0.3), 10, &settings);
        assert!(!outcome.blink);
        assert!((outcome.ear.unwrap() - 0.3).abs() < 1e-9);

        blink_at(&mut engine, 1_000, &settings);
        assert_eq!(engine.state().total_blinks, 1);
        assert_eq!(engine.state().blink_rate, 1);
    }

    #[test]
    fn test_degenerate_frame_has_no_signal() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);

        let outcome = engine.process_frame(&LandmarkFrame::new(Vec::new()), 10, &settings);
        assert_eq!(outcome.ear, None);
        assert!(!outcome.blink);
    }

    #[test]
    fn test_low_rate_warnings_one_minute_apart_fire_once() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);

        let mut alerts = blink_at(&mut engine, 1_000, &settings);
        alerts.extend(blink_at(&mut engine, 61_500, &settings));
        assert_eq!(alerts, vec![Alert::LowBlinkRate { rate: 1 }]);
    }

    #[test]
    fn test_warnings_six_minutes_apart_fire_twice() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);

        let mut alerts = blink_at(&mut engine, 1_000, &settings);
        // The first frame at 361 s sees the old blink gone, so the rate
        // drops to 0 and the strain warning takes the cooldown slot.
        alerts.extend(blink_at(&mut engine, 361_000, &settings));
        assert_eq!(alerts, vec![Alert::LowBlinkRate { rate: 1 }, Alert::HighStrain]);
    }

    #[test]
    fn test_low_rate_warns_again_once_the_cooldown_passes() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);

        // A blink every 40 s keeps the rate at 1 or 2, never 0.
        let alerts: Vec<Alert> = (0..10)
            .flat_map(|n| blink_at(&mut engine, 1_000 + n * 40_000, &settings))
            .collect();
        assert_eq!(
            alerts,
            vec![Alert::LowBlinkRate { rate: 1 }, Alert::LowBlinkRate { rate: 1 }]
        );
        assert_eq!(engine.state().total_blinks, 10);
    }

    #[test]
    fn test_frames_refresh_rate_between_ticks() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);
        blink_at(&mut engine, 1_000, &settings);
        assert_eq!(engine.state().blink_rate, 1);

        engine.process_frame(&synthetic_frame(0.3), 30_000, &settings);
        assert_eq!(engine.state().blink_rate, 1);

        let outcome = engine.process_frame(&synthetic_frame(0.3), 62_000, &settings);
        assert!(!outcome.blink);
        assert_eq!(engine.state().blink_rate, 0);
        assert_eq!(engine.state().strain_level, StrainLevel::High);
        assert_eq!(engine.state().session_secs, 0);
    }

    #[test]
    fn test_warnings_respect_notifications_setting() {
        let settings = UserSettings {
            notifications_enabled: false,
            ..quiet_settings()
        };
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);
        assert!(blink_at(&mut engine, 1_000, &settings).is_empty());
        assert_eq!(engine.state().last_warning_ms, None);
    }

    #[test]
    fn test_tick_decays_rate_without_new_blinks() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);
        blink_at(&mut engine, 1_000, &settings);
        assert_eq!(engine.state().blink_rate, 1);

        for sec in 1..=62 {
            engine.tick(sec * 1_000, &settings);
        }
        assert_eq!(engine.state().session_secs, 62);
        assert_eq!(engine.state().blink_rate, 0);
        assert_eq!(engine.detector().history_len(), 0);
        assert_eq!(engine.state().strain_level, StrainLevel::High);
    }

    #[test]
    fn test_start_resets_detector_and_applies_threshold() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);
        blink_at(&mut engine, 1_000, &settings);
        engine.stop(Utc::now(), &settings);

        let tighter = UserSettings {
            blink_threshold: 0.2,
            ..settings
        };
        engine.start(5_000, Utc::now(), &tighter);
        assert_eq!(engine.detector().blink_count(), 0);
        assert_eq!(engine.detector().threshold(), 0.2);
        assert_eq!(engine.state().total_blinks, 0);
        assert_eq!(engine.last_ear(), None);
    }

    #[test]
    fn test_stop_halts_ticking() {
        let settings = quiet_settings();
        let mut engine = MonitorEngine::new();
        engine.start(0, Utc::now(), &settings);
        engine.tick(1_000, &settings);
        engine.stop(Utc::now(), &settings);
        assert!(engine.tick(2_000, &settings).is_empty());
        assert_eq!(engine.state().session_secs, 1);
    }
}
