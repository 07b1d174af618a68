use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::strain::StrainLevel;

/// Summary of one completed monitoring session. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub total_blinks: u64,
    pub average_blink_rate: f64,
    pub eye_strain_level: StrainLevel,
    pub breaks_taken: u64,
}

/// Blinks per minute over the whole session, rounded to one decimal.
pub fn average_blink_rate(total_blinks: u64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        return 0.0;
    }
    let minutes = duration_secs as f64 / 60.0;
    round_to_tenth(total_blinks as f64 / minutes)
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Break reminders due over a session of this length.
pub fn breaks_taken(duration_secs: u64, break_interval_secs: u64) -> u64 {
    duration_secs.checked_div(break_interval_secs).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_rate_rounding() {
        assert_eq!(average_blink_rate(10, 31), 19.4);
        assert_eq!(average_blink_rate(17, 60), 17.0);
        assert_eq!(average_blink_rate(1, 180), 0.3);
        assert_eq!(average_blink_rate(5, 0), 0.0);
    }

    #[test]
    fn test_breaks_taken_floors() {
        assert_eq!(breaks_taken(31, 1200), 0);
        assert_eq!(breaks_taken(2500, 1200), 2);
        assert_eq!(breaks_taken(31, 10), 3);
        assert_eq!(breaks_taken(31, 0), 0);
    }

    #[test]
    fn test_record_serializes_with_storage_keys() {
        let record = SessionRecord {
            id: "abc".into(),
            date: Utc::now(),
            duration_secs: 42,
            total_blinks: 9,
            average_blink_rate: 12.9,
            eye_strain_level: StrainLevel::Moderate,
            breaks_taken: 0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["duration"], 42);
        assert_eq!(json["averageBlinkRate"], 12.9);
        assert_eq!(json["eyeStrainLevel"], "moderate");
    }
}
