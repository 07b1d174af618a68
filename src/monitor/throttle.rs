//! Rate limiting for low-blink-rate and high-strain warnings.
//!
//! Both warning kinds share one cooldown: whichever fires first blocks
//! the other until the interval has elapsed. Break reminders and nudges
//! run on their own cadence and never pass through here.

use crate::notify::Alert;

use super::strain::StrainLevel;

pub const WARNING_COOLDOWN_MS: u64 = 300_000;
/// Rates strictly between 0 and this value trigger a low-rate warning.
pub const LOW_BLINK_RATE_WARNING: u32 = 12;

#[derive(Debug, Clone, Copy)]
pub struct NotificationThrottle {
    cooldown_ms: u64,
}

impl Default for NotificationThrottle {
    fn default() -> Self {
        Self::new(WARNING_COOLDOWN_MS)
    }
}

impl NotificationThrottle {
    pub fn new(cooldown_ms: u64) -> Self {
        Self { cooldown_ms }
    }

    /// Whether a warning may fire at `now_ms` given the last one sent.
    pub fn allows(&self, now_ms: u64, last_warning_ms: Option<u64>, enabled: bool) -> bool {
        if !enabled {
            return false;
        }
        match last_warning_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.cooldown_ms,
        }
    }

    /// Pick at most one warning for this evaluation. A low blink rate wins
    /// over high strain.
    pub fn select(
        &self,
        now_ms: u64,
        last_warning_ms: Option<u64>,
        enabled: bool,
        blink_rate: u32,
        level: StrainLevel,
    ) -> Option<Alert> {
        if !self.allows(now_ms, last_warning_ms, enabled) {
            return None;
        }

        if blink_rate > 0 && blink_rate < LOW_BLINK_RATE_WARNING {
            Some(Alert::LowBlinkRate { rate: blink_rate })
        } else if level == StrainLevel::High {
            Some(Alert::HighStrain)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_rate_spacing() {
        let throttle = NotificationThrottle::default();
        let first = throttle.select(0, None, true, 8, StrainLevel::High);
        assert_eq!(first, Some(Alert::LowBlinkRate { rate: 8 }));

        assert_eq!(throttle.select(60_000, Some(0), true, 8, StrainLevel::High), None);
        assert_eq!(
            throttle.select(360_000, Some(0), true, 8, StrainLevel::High),
            Some(Alert::LowBlinkRate { rate: 8 })
        );
    }

    #[test]
    fn test_cooldown_boundary_is_exclusive() {
        let throttle = NotificationThrottle::default();
        assert!(!throttle.allows(300_000, Some(0), true));
        assert!(throttle.allows(300_001, Some(0), true));
    }

    #[test]
    fn test_high_strain_when_rate_is_not_low() {
        let throttle = NotificationThrottle::default();
        // Zero means no signal yet, not a low rate.
        assert_eq!(
            throttle.select(0, None, true, 0, StrainLevel::High),
            Some(Alert::HighStrain)
        );
        assert_eq!(
            throttle.select(0, None, true, 12, StrainLevel::High),
            Some(Alert::HighStrain)
        );
        assert_eq!(throttle.select(0, None, true, 13, StrainLevel::Moderate), None);
    }

    #[test]
    fn test_disabled_notifications_never_fire() {
        let throttle = NotificationThrottle::default();
        assert_eq!(throttle.select(0, None, false, 5, StrainLevel::High), None);
    }
}
