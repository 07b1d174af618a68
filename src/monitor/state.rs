use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::session::{average_blink_rate, breaks_taken, SessionRecord};
use crate::notify::Alert;
use crate::settings::UserSettings;

use super::strain::{classify, StrainLevel};
use super::throttle::NotificationThrottle;

/// Sessions at or under this length are not worth keeping.
pub const MIN_RECORDED_SESSION_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MonitorStatus {
    Idle,
    Running,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        MonitorStatus::Idle
    }
}

/// Live state of the monitoring session. Mutated only through the
/// transition methods below; every transition is total and invalid
/// calls are no-ops.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: MonitorStatus,
    pub session_secs: u64,
    pub total_blinks: u64,
    pub blink_rate: u32,
    pub strain_level: StrainLevel,
    /// Monotonic ms of the last break reminder (or session start).
    pub last_break_ms: Option<u64>,
    /// Monotonic ms of the last throttled warning. Survives restarts so a
    /// quick stop/start cannot bypass the cooldown.
    pub last_warning_ms: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_monitoring(&self) -> bool {
        self.status == MonitorStatus::Running
    }

    /// Idle/Running → Running with zeroed counters.
    pub fn begin_session(&mut self, now_ms: u64, started_at: DateTime<Utc>) {
        *self = Self {
            status: MonitorStatus::Running,
            last_break_ms: Some(now_ms),
            last_warning_ms: self.last_warning_ms,
            started_at: Some(started_at),
            ..Self::default()
        };
    }

    /// Running → Idle. Returns the record to persist when the session ran
    /// longer than [`MIN_RECORDED_SESSION_SECS`].
    pub fn stop(&mut self, stopped_at: DateTime<Utc>, break_interval_secs: u64) -> Option<SessionRecord> {
        if !self.is_monitoring() {
            return None;
        }
        self.status = MonitorStatus::Idle;

        if self.session_secs <= MIN_RECORDED_SESSION_SECS {
            return None;
        }

        Some(SessionRecord {
            id: Uuid::new_v4().to_string(),
            date: stopped_at,
            duration_secs: self.session_secs,
            total_blinks: self.total_blinks,
            average_blink_rate: average_blink_rate(self.total_blinks, self.session_secs),
            eye_strain_level: self.strain_level,
            breaks_taken: breaks_taken(self.session_secs, break_interval_secs),
        })
    }

    /// One second of session time. Returns the break reminder and nudge
    /// alerts due at the new time.
    pub fn tick(&mut self, now_ms: u64, settings: &UserSettings) -> Vec<Alert> {
        let mut alerts = Vec::new();
        if !self.is_monitoring() {
            return alerts;
        }

        self.session_secs += 1;

        if is_due(self.session_secs, settings.break_interval_secs) {
            self.last_break_ms = Some(now_ms);
            if settings.notifications_enabled {
                alerts.push(Alert::Break);
            }
        }

        if settings.nudges_enabled && is_due(self.session_secs, settings.nudge_frequency.interval_secs()) {
            alerts.push(Alert::Nudge);
        }

        alerts
    }

    pub fn record_blink(&mut self) {
        if self.is_monitoring() {
            self.total_blinks += 1;
        }
    }

    /// Store the latest blink rate, then re-derive strain and maybe warn.
    pub fn update_rate(
        &mut self,
        rate: u32,
        now_ms: u64,
        settings: &UserSettings,
        throttle: &NotificationThrottle,
    ) -> Option<Alert> {
        self.blink_rate = rate;
        self.evaluate(now_ms, settings, throttle)
    }

    /// Reclassify strain from the current rate and session length. Only
    /// runs while monitoring; the level is frozen once stopped.
    pub fn evaluate(
        &mut self,
        now_ms: u64,
        settings: &UserSettings,
        throttle: &NotificationThrottle,
    ) -> Option<Alert> {
        if !self.is_monitoring() {
            return None;
        }

        self.strain_level = classify(self.blink_rate, self.session_secs);

        let alert = throttle.select(
            now_ms,
            self.last_warning_ms,
            settings.notifications_enabled,
            self.blink_rate,
            self.strain_level,
        );
        if alert.is_some() {
            self.last_warning_ms = Some(now_ms);
        }
        alert
    }
}

fn is_due(session_secs: u64, interval_secs: u64) -> bool {
    session_secs > 0 && session_secs.checked_rem(interval_secs) == Some(0)
}
