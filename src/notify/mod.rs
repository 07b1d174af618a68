pub mod cue;
pub mod player;

use std::sync::Arc;

use log::{info, warn};

use crate::monitor::strain::{NORMAL_BLINK_RATE_MAX, NORMAL_BLINK_RATE_MIN};
use crate::settings::SettingsStore;

use cue::Cue;
use player::CuePlayer;

/// Outbound alerts raised by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Break,
    LowBlinkRate { rate: u32 },
    HighStrain,
    Nudge,
    ExerciseComplete { name: String },
}

impl Alert {
    pub fn dispatch(&self, notifier: &dyn Notifier) {
        match self {
            Alert::Break => notifier.notify_break(),
            Alert::LowBlinkRate { rate } => notifier.notify_low_blink_rate(*rate),
            Alert::HighStrain => notifier.notify_high_strain(),
            Alert::Nudge => notifier.notify_nudge(),
            Alert::ExerciseComplete { name } => notifier.notify_exercise_complete(name),
        }
    }
}

/// Fire-and-forget sink for alerts. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify_break(&self);
    fn notify_low_blink_rate(&self, rate: u32);
    fn notify_high_strain(&self);
    fn notify_exercise_complete(&self, name: &str);
    fn notify_nudge(&self);
}

/// Logs each alert and, when sound is enabled, plays its cue.
pub struct DesktopNotifier {
    settings: Arc<SettingsStore>,
    player: CuePlayer,
}

impl DesktopNotifier {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self {
            settings,
            player: CuePlayer::new(),
        }
    }

    fn play(&self, cue: Cue) {
        if !self.settings.current().sound_enabled {
            // Cut off anything still queued from before sound was turned off.
            self.player.stop();
            return;
        }
        if let Err(err) = self.player.play(cue) {
            warn!("Failed to play {cue:?} cue: {err}");
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify_break(&self) {
        info!("Time for a break! Look at something 20 feet away for 20 seconds");
        self.play(Cue::Message);
    }

    fn notify_low_blink_rate(&self, rate: u32) {
        warn!(
            "Low blink rate detected: {rate}/min (normal: {NORMAL_BLINK_RATE_MIN}-{NORMAL_BLINK_RATE_MAX}/min)"
        );
        self.play(Cue::Warning);
    }

    fn notify_high_strain(&self) {
        warn!("High eye strain risk: consider taking a longer break");
        self.play(Cue::Warning);
    }

    fn notify_exercise_complete(&self, name: &str) {
        info!("Exercise completed: {name}");
        self.play(Cue::Success);
    }

    fn notify_nudge(&self) {
        info!("Gentle reminder: blink fully and often");
        self.play(Cue::Reminder);
    }
}
