use serde::{Deserialize, Serialize};

/// Below this many blinks per minute the rate counts as reduced.
pub const NORMAL_BLINK_RATE_MIN: u32 = 15;
pub const NORMAL_BLINK_RATE_MAX: u32 = 20;
const SEVERE_BLINK_RATE: u32 = 10;
/// Sessions longer than an hour are bumped one severity level.
const FATIGUE_SESSION_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum StrainLevel {
    Low,
    Moderate,
    High,
}

impl StrainLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrainLevel::Low => "low",
            StrainLevel::Moderate => "moderate",
            StrainLevel::High => "high",
        }
    }

    fn escalate(self) -> Self {
        match self {
            StrainLevel::Low => StrainLevel::Moderate,
            StrainLevel::Moderate | StrainLevel::High => StrainLevel::High,
        }
    }
}

impl Default for StrainLevel {
    fn default() -> Self {
        StrainLevel::Low
    }
}

/// Heuristic eye-strain tier from the current blink rate and session length.
///
/// Re-evaluated from scratch on every call, with no smoothing: a rate
/// hovering at a boundary flips the level back and forth.
pub fn classify(blink_rate: u32, session_secs: u64) -> StrainLevel {
    let level = if blink_rate < NORMAL_BLINK_RATE_MIN {
        if blink_rate < SEVERE_BLINK_RATE {
            StrainLevel::High
        } else {
            StrainLevel::Moderate
        }
    } else {
        StrainLevel::Low
    };

    if session_secs > FATIGUE_SESSION_SECS {
        level.escalate()
    } else {
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_bands() {
        assert_eq!(classify(8, 100), StrainLevel::High);
        assert_eq!(classify(12, 100), StrainLevel::Moderate);
        assert_eq!(classify(18, 100), StrainLevel::Low);
        assert_eq!(classify(35, 100), StrainLevel::Low);
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(classify(0, 0), StrainLevel::High);
        assert_eq!(classify(9, 0), StrainLevel::High);
        assert_eq!(classify(10, 0), StrainLevel::Moderate);
        assert_eq!(classify(14, 0), StrainLevel::Moderate);
        assert_eq!(classify(15, 0), StrainLevel::Low);
    }

    #[test]
    fn test_long_sessions_escalate() {
        assert_eq!(classify(18, 4000), StrainLevel::Moderate);
        assert_eq!(classify(12, 4000), StrainLevel::High);
        assert_eq!(classify(8, 4000), StrainLevel::High);
        assert_eq!(classify(18, 3600), StrainLevel::Low);
        assert_eq!(classify(18, 3601), StrainLevel::Moderate);
    }

    #[test]
    fn test_levels_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&StrainLevel::Moderate).unwrap(),
            "\"moderate\""
        );
        assert!(StrainLevel::High > StrainLevel::Low);
    }
}
