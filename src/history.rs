use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{Attempt, TrainingMode};
use crate::util::mean;

/// Number of sessions in each window of the trend comparison
pub const TREND_WINDOW: usize = 5;

/// Record of one completed session. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub id: Uuid,
    pub preset_id: Uuid,
    pub exercise_name: String,
    pub mode: TrainingMode,
    pub date: DateTime<Utc>,
    pub accumulated_total: f64,
    pub target: f64,
    pub rest_seconds: i64,
    pub adjustment: f64,
    pub attempt_count: usize,
    pub duration_seconds: u64,
    pub attempts: Vec<Attempt>,
}

impl SessionHistory {
    pub fn reached_target(&self) -> bool {
        self.accumulated_total >= self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    /// Sessions are getting shorter
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresetStats {
    pub total_sessions: usize,
    /// Truncating integer mean, in seconds
    pub average_duration: u64,
    pub best_duration: u64,
    pub average_attempts: f64,
    pub best_accumulated: f64,
    pub average_accumulated: f64,
    pub last_session: DateTime<Utc>,
    pub trend: Trend,
}

/// Histories belonging to `preset_id`, newest first
pub fn histories_for(preset_id: Uuid, all: &[SessionHistory]) -> Vec<SessionHistory> {
    all.iter()
        .filter(|h| h.preset_id == preset_id)
        .cloned()
        .sorted_by(|a, b| b.date.cmp(&a.date))
        .collect()
}

/// Derive statistics for one preset's histories. Input order does not matter.
pub fn compute_stats(histories: &[SessionHistory]) -> Option<PresetStats> {
    if histories.is_empty() {
        return None;
    }

    let newest_first: Vec<&SessionHistory> = histories
        .iter()
        .sorted_by(|a, b| b.date.cmp(&a.date))
        .collect();
    let durations: Vec<u64> = newest_first.iter().map(|h| h.duration_seconds).collect();
    let attempts: Vec<f64> = newest_first
        .iter()
        .map(|h| h.attempt_count as f64)
        .collect();
    let totals: Vec<f64> = newest_first.iter().map(|h| h.accumulated_total).collect();

    Some(PresetStats {
        total_sessions: newest_first.len(),
        average_duration: integer_mean(&durations).unwrap_or(0),
        best_duration: durations.iter().copied().min().unwrap_or(0),
        average_attempts: mean(&attempts).unwrap_or(0.0),
        best_accumulated: totals.iter().copied().fold(f64::MIN, f64::max),
        average_accumulated: mean(&totals).unwrap_or(0.0),
        last_session: newest_first[0].date,
        trend: trend_of(&durations),
    })
}

/// Compare the newest window of durations against the one before it.
/// `durations` must be ordered newest first.
pub fn trend_of(durations: &[u64]) -> Trend {
    let recent = &durations[..durations.len().min(TREND_WINDOW)];
    let previous = durations
        .get(TREND_WINDOW..durations.len().min(TREND_WINDOW * 2))
        .unwrap_or(&[]);

    match (integer_mean(recent), integer_mean(previous)) {
        (Some(recent), Some(previous)) => {
            let (recent, previous) = (recent as f64, previous as f64);
            if recent < previous * 0.95 {
                Trend::Improving
            } else if recent > previous * 1.05 {
                Trend::Declining
            } else {
                Trend::Stable
            }
        }
        _ => Trend::Stable,
    }
}

/// Which records a finished session set against earlier sessions of the same preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersonalRecords {
    /// Highest raw value of a single attempt
    pub best_attempt: bool,
    pub fastest_completion: bool,
    pub highest_total: bool,
}

impl PersonalRecords {
    pub fn any(&self) -> bool {
        self.best_attempt || self.fastest_completion || self.highest_total
    }
}

/// Compare `current` with `previous`, which must not contain it.
/// A first session sets every record.
pub fn personal_records(current: &SessionHistory, previous: &[SessionHistory]) -> PersonalRecords {
    if previous.is_empty() {
        return PersonalRecords {
            best_attempt: true,
            fastest_completion: true,
            highest_total: true,
        };
    }

    let best_raw = |h: &SessionHistory| h.attempts.iter().map(|a| a.raw_value).fold(0.0, f64::max);
    let previous_best_attempt = previous.iter().map(best_raw).fold(0.0, f64::max);
    let previous_fastest = previous.iter().map(|h| h.duration_seconds).min().unwrap_or(u64::MAX);
    let previous_highest = previous
        .iter()
        .map(|h| h.accumulated_total)
        .fold(f64::MIN, f64::max);

    PersonalRecords {
        best_attempt: best_raw(current) > previous_best_attempt,
        fastest_completion: current.duration_seconds < previous_fastest,
        highest_total: current.accumulated_total > previous_highest,
    }
}

fn integer_mean(values: &[u64]) -> Option<u64> {
    match values.len() {
        0 => None,
        n => Some(values.iter().sum::<u64>() / n as u64),
    }
}
