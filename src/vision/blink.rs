//! Blink event detection and the trailing-minute blink rate.
//!
//! Averaged EAR samples go through a five-slot ring buffer. The eye counts
//! as closed only while the three most recent samples all sit under the
//! threshold, which filters single-frame noise. A blink is confirmed on
//! the closed→open edge, and a second edge inside the debounce window is
//! dropped so one physical blink is never counted twice.

use std::collections::VecDeque;

pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.25;
pub const BLINK_RATE_WINDOW_MS: u64 = 60_000;

const EAR_BUFFER_SIZE: usize = 5;
const CONSECUTIVE_FRAMES: usize = 3;
const BLINK_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f64,
    ear_buffer: VecDeque<f64>,
    is_blinking: bool,
    /// `None` until the first confirmed blink.
    last_blink_ms: Option<u64>,
    blink_count: u64,
    /// Confirmed blink timestamps, oldest first.
    blink_history: VecDeque<u64>,
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BLINK_THRESHOLD)
    }
}

impl BlinkDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ear_buffer: VecDeque::with_capacity(EAR_BUFFER_SIZE),
            is_blinking: false,
            last_blink_ms: None,
            blink_count: 0,
            blink_history: VecDeque::new(),
        }
    }

    /// Feed one frame's EAR pair. Returns true when this frame confirms a blink.
    pub fn observe(&mut self, left_ear: f64, right_ear: f64, now_ms: u64) -> bool {
        let avg = (left_ear + right_ear) / 2.0;
        if avg.is_nan() || avg <= 0.0 {
            return false;
        }

        self.ear_buffer.push_back(avg);
        while self.ear_buffer.len() > EAR_BUFFER_SIZE {
            self.ear_buffer.pop_front();
        }

        if self.ear_buffer.len() < CONSECUTIVE_FRAMES {
            return false;
        }

        let closed = self
            .ear_buffer
            .iter()
            .rev()
            .take(CONSECUTIVE_FRAMES)
            .all(|&ear| ear < self.threshold);

        if closed && !self.is_blinking {
            self.is_blinking = true;
            return false;
        }

        if closed || !self.is_blinking {
            return false;
        }

        self.is_blinking = false;

        let debounced = self
            .last_blink_ms
            .map_or(true, |last| now_ms.saturating_sub(last) > BLINK_DEBOUNCE_MS);
        if !debounced {
            return false;
        }

        self.blink_count += 1;
        self.last_blink_ms = Some(now_ms);
        self.blink_history.push_back(now_ms);
        self.prune(now_ms);
        true
    }

    /// Blinks confirmed in `(now - 60s, now]`. Computed on every call so the
    /// rate decays as old blinks age out even without new ones.
    pub fn rate(&self, now_ms: u64) -> u32 {
        let cutoff = now_ms as i64 - BLINK_RATE_WINDOW_MS as i64;
        self.blink_history
            .iter()
            .filter(|&&ts| ts <= now_ms && ts as i64 > cutoff)
            .count() as u32
    }

    /// Drop history entries that fell out of the trailing window.
    pub fn prune(&mut self, now_ms: u64) {
        if now_ms < BLINK_RATE_WINDOW_MS {
            return;
        }
        let cutoff = now_ms - BLINK_RATE_WINDOW_MS;
        while let Some(&front) = self.blink_history.front() {
            if front <= cutoff {
                self.blink_history.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn history_len(&self) -> usize {
        self.blink_history.len()
    }

    /// Most recent buffered average EAR, 0 when nothing is buffered.
    pub fn current_ear(&self) -> f64 {
        self.ear_buffer.back().copied().unwrap_or(0.0)
    }

    pub fn is_blinking(&self) -> bool {
        self.is_blinking
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Back to a fresh detector. The threshold is configuration and survives.
    pub fn reset(&mut self) {
        self.ear_buffer.clear();
        self.is_blinking = false;
        self.last_blink_ms = None;
        self.blink_count = 0;
        self.blink_history.clear();
    }
}
