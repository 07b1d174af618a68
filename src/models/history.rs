use serde::{Deserialize, Serialize};

use super::session::{round_to_tenth, SessionRecord};

const TREND_WINDOW: usize = 7;

/// Aggregates over stored sessions, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_sessions: usize,
    pub total_time_secs: u64,
    /// Mean of the per-session average blink rates.
    pub average_blink_rate: f64,
    /// Percent change of the latest seven sessions' mean rate against the
    /// seven before them. Zero until both windows have data.
    pub improvement_trend: i64,
}

impl HistoryStats {
    pub fn from_sessions(sessions: &[SessionRecord]) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }

        let total_time_secs = sessions.iter().map(|s| s.duration_secs).sum();
        let average_blink_rate = mean_rate(sessions);

        let recent_start = sessions.len().saturating_sub(TREND_WINDOW);
        let previous_start = recent_start.saturating_sub(TREND_WINDOW);
        let recent = &sessions[recent_start..];
        let previous = &sessions[previous_start..recent_start];

        let improvement_trend = if previous.is_empty() || recent.is_empty() {
            0
        } else {
            let previous_avg = mean_rate(previous);
            if previous_avg == 0.0 {
                0
            } else {
                ((mean_rate(recent) - previous_avg) / previous_avg * 100.0).round() as i64
            }
        };

        Self {
            total_sessions: sessions.len(),
            total_time_secs,
            average_blink_rate: round_to_tenth(average_blink_rate),
            improvement_trend,
        }
    }
}

fn mean_rate(sessions: &[SessionRecord]) -> f64 {
    sessions.iter().map(|s| s.average_blink_rate).sum::<f64>() / sessions.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::strain::StrainLevel;
    use chrono::Utc;

    fn record(rate: f64, duration_secs: u64) -> SessionRecord {
        SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            date: Utc::now(),
            duration_secs,
            total_blinks: 0,
            average_blink_rate: rate,
            eye_strain_level: StrainLevel::Low,
            breaks_taken: 0,
        }
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(HistoryStats::from_sessions(&[]), HistoryStats::default());
    }

    #[test]
    fn test_totals_and_mean() {
        let stats = HistoryStats::from_sessions(&[record(10.0, 60), record(15.0, 120), record(15.5, 30)]);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_time_secs, 210);
        assert_eq!(stats.average_blink_rate, 13.5);
        assert_eq!(stats.improvement_trend, 0);
    }

    #[test]
    fn test_trend_compares_last_two_weeks_of_sessions() {
        let mut sessions: Vec<SessionRecord> = (0..7).map(|_| record(10.0, 60)).collect();
        sessions.extend((0..7).map(|_| record(12.5, 60)));
        assert_eq!(HistoryStats::from_sessions(&sessions).improvement_trend, 25);

        // A partial previous window still counts.
        let sessions: Vec<SessionRecord> = [20.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0]
            .iter()
            .map(|&r| record(r, 60))
            .collect();
        assert_eq!(HistoryStats::from_sessions(&sessions).improvement_trend, -50);
    }
}
