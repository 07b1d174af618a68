//! Short synthesized alert tones.
//!
//! Each cue is a handful of sine beeps with a 10ms linear attack and an
//! exponential decay to 0.001 over the beep's length.

use std::f32::consts::TAU;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;
const ATTACK_SECS: f32 = 0.01;
const DECAY_FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Two-note beep for break reminders.
    Message,
    /// Single soft tone for nudges.
    Reminder,
    /// Three urgent beeps for warnings.
    Warning,
    /// Rising three-note sequence.
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tone {
    frequency: f32,
    start_secs: f32,
    duration_secs: f32,
    volume: f32,
}

impl Tone {
    const fn new(frequency: f32, start_secs: f32, duration_secs: f32, volume: f32) -> Self {
        Self {
            frequency,
            start_secs,
            duration_secs,
            volume,
        }
    }

    fn end_secs(&self) -> f32 {
        self.start_secs + self.duration_secs
    }

    fn sample(&self, t: f32) -> f32 {
        let local = t - self.start_secs;
        if local < 0.0 || local >= self.duration_secs {
            return 0.0;
        }
        self.envelope(local) * (TAU * self.frequency * local).sin()
    }

    fn envelope(&self, local: f32) -> f32 {
        if local < ATTACK_SECS {
            return self.volume * local / ATTACK_SECS;
        }
        let span = (self.duration_secs - ATTACK_SECS).max(f32::EPSILON);
        let progress = (local - ATTACK_SECS) / span;
        self.volume * (DECAY_FLOOR / self.volume).powf(progress)
    }
}

impl Cue {
    fn tones(&self) -> Vec<Tone> {
        match self {
            Cue::Message => vec![Tone::new(800.0, 0.0, 0.1, 0.15), Tone::new(600.0, 0.15, 0.1, 0.15)],
            Cue::Reminder => vec![Tone::new(500.0, 0.0, 0.3, 0.1)],
            Cue::Warning => (0..3)
                .map(|i| Tone::new(1000.0, i as f32 * 0.1, 0.1, 0.2))
                .collect(),
            Cue::Success => vec![
                Tone::new(400.0, 0.0, 0.1, 0.1),
                Tone::new(600.0, 0.1, 0.1, 0.1),
                Tone::new(800.0, 0.2, 0.2, 0.1),
            ],
        }
    }
}

/// Mono sample stream for one cue.
pub struct ToneSequence {
    tones: Vec<Tone>,
    sample_rate: u32,
    index: u64,
    total_samples: u64,
}

impl ToneSequence {
    pub fn new(cue: Cue) -> Self {
        let tones = cue.tones();
        let end = tones.iter().map(Tone::end_secs).fold(0.0_f32, f32::max);
        Self {
            tones,
            sample_rate: SAMPLE_RATE,
            index: 0,
            total_samples: (end * SAMPLE_RATE as f32).ceil() as u64,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_samples as f64 / self.sample_rate as f64)
    }
}

impl Iterator for ToneSequence {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total_samples {
            return None;
        }
        let t = self.index as f32 / self.sample_rate as f32;
        self.index += 1;
        let mixed: f32 = self.tones.iter().map(|tone| tone.sample(t)).sum();
        Some(mixed.clamp(-1.0, 1.0))
    }
}

#[cfg(feature = "sound")]
impl rodio::Source for ToneSequence {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_length_ms(cue: Cue, expected_ms: f64) {
        let actual_ms = ToneSequence::new(cue).duration().as_secs_f64() * 1000.0;
        assert!((actual_ms - expected_ms).abs() < 1.0, "{cue:?} lasted {actual_ms}ms");
    }

    #[test]
    fn test_cue_lengths() {
        assert_length_ms(Cue::Message, 250.0);
        assert_length_ms(Cue::Reminder, 300.0);
        assert_length_ms(Cue::Warning, 300.0);
        assert_length_ms(Cue::Success, 400.0);
    }

    #[test]
    fn test_samples_stay_within_volume() {
        let peak = ToneSequence::new(Cue::Warning).fold(0.0_f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.1);
        assert!(peak <= 0.2 + 1e-4);
    }

    #[test]
    fn test_gap_between_message_beeps_is_silent() {
        let samples: Vec<f32> = ToneSequence::new(Cue::Message).collect();
        let gap_start = (0.11 * SAMPLE_RATE as f32) as usize;
        let gap_end = (0.14 * SAMPLE_RATE as f32) as usize;
        assert!(samples[gap_start..gap_end].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_envelope_starts_silent_and_decays() {
        let tone = Tone::new(500.0, 0.0, 0.3, 0.1);
        assert_eq!(tone.envelope(0.0), 0.0);
        assert!((tone.envelope(ATTACK_SECS) - 0.1).abs() < 1e-6);
        assert!(tone.envelope(0.299) < 0.0011);
    }
}
