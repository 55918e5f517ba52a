use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::SessionHistory;
use crate::preset::Preset;
use crate::runtime::{Clock, SystemClock};

/// Taps on bail/stop are ignored for this long after a hold starts
pub const DEFAULT_ARMING_DELAY: Duration = Duration::from_secs(1);

/// Remaining rest seconds at which the warning cue fires
pub const DEFAULT_REST_WARNING_SECS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrainingMode {
    /// Holds measured in seconds; adjustment is subtracted per attempt
    Time,
    /// Sets measured in reps; adjustment is added per set
    Reps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown training mode '{}', expected 'time' or 'reps'", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for TrainingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(Self::Time),
            "reps" => Ok(Self::Reps),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
pub enum Phase {
    #[default]
    Setup,
    Training,
    Resting,
    Complete,
}

/// Settings for one session. Checked by [`SessionEngine::start_session`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub mode: TrainingMode,
    pub target: f64,
    pub rest_seconds: i64,
    pub adjustment: f64,
}

impl Configuration {
    pub fn new(mode: TrainingMode, target: f64, rest_seconds: i64, adjustment: f64) -> Self {
        Self {
            mode,
            target,
            rest_seconds,
            adjustment,
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.target.is_finite() || self.target < 1.0 {
            return Err(SessionError::InvalidConfiguration(ConfigField::Target));
        }
        if self.rest_seconds < 0 {
            return Err(SessionError::InvalidConfiguration(ConfigField::RestSeconds));
        }
        if !self.adjustment.is_finite() || self.adjustment < 0.0 {
            return Err(SessionError::InvalidConfiguration(ConfigField::Adjustment));
        }
        Ok(())
    }

    /// Value an attempt contributes once the adjustment is applied
    pub fn counted_value(&self, raw: f64) -> f64 {
        match self.mode {
            TrainingMode::Time => (raw - self.adjustment).max(0.0),
            TrainingMode::Reps => raw + self.adjustment,
        }
    }

    fn rest_countdown(&self) -> u32 {
        u32::try_from(self.rest_seconds).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub raw_value: f64,
    pub adjustment: f64,
    pub counted_value: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub accumulated_total: f64,
    pub attempts: Vec<Attempt>,
    pub rest_remaining: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Side-channel signal carried by a rest tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Warning,
    Finished,
}

/// Result of one rest tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestTick {
    pub remaining: u32,
    pub cue: Option<Cue>,
    pub phase: Phase,
}

/// Identifies one rest period. Ticks scheduled for an earlier period are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Target,
    RestSeconds,
    Adjustment,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Target => "target must be at least 1",
            Self::RestSeconds => "rest time cannot be negative",
            Self::Adjustment => "adjustment cannot be negative",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    InvalidConfiguration(ConfigField),
    InvalidTransition { op: &'static str, phase: Phase },
    WrongMode { op: &'static str, mode: TrainingMode },
    /// Bail/stop tapped before the arming delay elapsed
    NotArmed { remaining: Duration },
    InvalidValue(f64),
    StaleTick,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration(field) => write!(f, "invalid configuration: {field}"),
            Self::InvalidTransition { op, phase } => {
                write!(f, "cannot {op} while in {phase} phase")
            }
            Self::WrongMode { op, mode } => write!(f, "cannot {op} in {mode} mode"),
            Self::NotArmed { remaining } => {
                write!(f, "get ready: controls unlock in {}ms", remaining.as_millis())
            }
            Self::InvalidValue(v) => write!(f, "invalid attempt value {v}"),
            Self::StaleTick => write!(f, "rest tick belongs to a finished rest period"),
        }
    }
}

impl std::error::Error for SessionError {}

/// The accumulation state machine shared by every front end.
///
/// Every operation either applies completely or returns an error and leaves
/// the engine untouched.
pub struct SessionEngine {
    state: SessionState,
    config: Option<Configuration>,
    training_entered_at: Option<DateTime<Utc>>,
    rest_epoch: u64,
    arming_delay: Duration,
    rest_warning_secs: u32,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("rest_epoch", &self.rest_epoch)
            .finish_non_exhaustive()
    }
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEngine {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: SessionState::default(),
            config: None,
            training_entered_at: None,
            rest_epoch: 0,
            arming_delay: DEFAULT_ARMING_DELAY,
            rest_warning_secs: DEFAULT_REST_WARNING_SECS,
            clock,
        }
    }

    pub fn arming_delay(mut self, delay: Duration) -> Self {
        self.arming_delay = delay;
        self
    }

    pub fn rest_warning_secs(mut self, secs: u32) -> Self {
        self.rest_warning_secs = secs;
        self
    }

    pub fn start_session(&mut self, config: Configuration) -> Result<Phase, SessionError> {
        if self.state.phase != Phase::Setup {
            return Err(SessionError::InvalidTransition {
                op: "start a session",
                phase: self.state.phase,
            });
        }
        config.validate()?;

        let now = self.clock.now();
        self.state = SessionState {
            phase: Phase::Training,
            accumulated_total: 0.0,
            attempts: Vec::new(),
            rest_remaining: 0,
            started_at: Some(now),
            completed_at: None,
        };
        self.config = Some(config);
        self.training_entered_at = Some(now);

        info!(
            "session started: mode={} target={} rest={}s adjustment={}",
            config.mode, config.target, config.rest_seconds, config.adjustment
        );
        Ok(Phase::Training)
    }

    /// End a hold early. The adjustment is subtracted before banking.
    pub fn bail_out(&mut self, raw_hold_seconds: f64) -> Result<Phase, SessionError> {
        let config = self.training_config("bail out", TrainingMode::Time)?;
        check_raw(raw_hold_seconds)?;
        self.ensure_armed()?;

        let counted = config.counted_value(raw_hold_seconds);
        self.record(raw_hold_seconds, config.adjustment, counted);
        Ok(self.advance_after_attempt(&config))
    }

    /// End a hold and finish the session with the full hold time counted.
    pub fn stop(&mut self, raw_hold_seconds: f64) -> Result<Phase, SessionError> {
        self.training_config("stop", TrainingMode::Time)?;
        check_raw(raw_hold_seconds)?;
        self.ensure_armed()?;

        self.record(raw_hold_seconds, 0.0, raw_hold_seconds);
        self.complete();
        Ok(Phase::Complete)
    }

    pub fn done_with_set(&mut self, raw_reps: f64) -> Result<Phase, SessionError> {
        let config = self.training_config("finish a set", TrainingMode::Reps)?;
        check_raw(raw_reps)?;

        let counted = config.counted_value(raw_reps);
        self.record(raw_reps, config.adjustment, counted);
        Ok(self.advance_after_attempt(&config))
    }

    pub fn rest_tick(&mut self, token: RestToken) -> Result<RestTick, SessionError> {
        self.require_phase("tick rest", Phase::Resting)?;
        if token != self.current_rest_token() {
            return Err(SessionError::StaleTick);
        }

        let mut cue = (self.state.rest_remaining == self.rest_warning_secs).then_some(Cue::Warning);
        self.state.rest_remaining = self.state.rest_remaining.saturating_sub(1);

        if self.state.rest_remaining == 0 {
            cue = Some(Cue::Finished);
            self.enter_training();
            debug!("rest finished, back to training");
        }

        Ok(RestTick {
            remaining: self.state.rest_remaining,
            cue,
            phase: self.state.phase,
        })
    }

    pub fn skip_rest(&mut self) -> Result<Phase, SessionError> {
        self.require_phase("skip rest", Phase::Resting)?;
        debug!("rest skipped with {}s left", self.state.rest_remaining);
        self.enter_training();
        Ok(Phase::Training)
    }

    /// Discard the session from any phase.
    pub fn reset(&mut self) -> Phase {
        if self.state.phase != Phase::Setup {
            info!(
                "session reset from {} with {} attempts",
                self.state.phase,
                self.state.attempts.len()
            );
        }
        self.state = SessionState::default();
        self.config = None;
        self.training_entered_at = None;
        self.rest_epoch += 1;
        Phase::Setup
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    pub fn accumulated_total(&self) -> f64 {
        self.state.accumulated_total
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.state.attempts
    }

    pub fn rest_remaining(&self) -> u32 {
        self.state.rest_remaining
    }

    /// Token for the current rest period, if resting
    pub fn rest_token(&self) -> Option<RestToken> {
        (self.state.phase == Phase::Resting).then(|| self.current_rest_token())
    }

    pub fn remaining_to_target(&self) -> f64 {
        self.config
            .map(|c| (c.target - self.state.accumulated_total).max(0.0))
            .unwrap_or(0.0)
    }

    /// Fraction of the target banked so far, capped at 1
    pub fn progress(&self) -> f64 {
        self.config
            .map(|c| (self.state.accumulated_total / c.target).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    pub fn target_reached(&self) -> bool {
        self.config
            .is_some_and(|c| self.state.accumulated_total >= c.target)
    }

    /// Seconds since the current hold (or set) began
    pub fn current_hold_seconds(&self) -> f64 {
        match (self.state.phase, self.training_entered_at) {
            (Phase::Training, Some(entered)) => elapsed(entered, self.clock.now()).as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Total if a hold of `raw_hold_seconds` were bailed out right now
    pub fn live_total(&self, raw_hold_seconds: f64) -> f64 {
        match self.config {
            Some(c) if self.state.phase == Phase::Training => {
                self.state.accumulated_total + c.counted_value(raw_hold_seconds.max(0.0))
            }
            _ => self.state.accumulated_total,
        }
    }

    pub fn arming_remaining(&self) -> Duration {
        match (self.state.phase, self.training_entered_at) {
            (Phase::Training, Some(entered)) => self
                .arming_delay
                .saturating_sub(elapsed(entered, self.clock.now())),
            _ => self.arming_delay,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.phase == Phase::Training && self.arming_remaining().is_zero()
    }

    /// Wall time of the session in whole seconds, up to completion or now
    pub fn duration_seconds(&self) -> u64 {
        match self.state.started_at {
            Some(started) => {
                let end = self.state.completed_at.unwrap_or_else(|| self.clock.now());
                elapsed(started, end).as_secs()
            }
            None => 0,
        }
    }

    /// The record to persist for a completed session
    pub fn history(&self, preset: &Preset) -> Option<SessionHistory> {
        if self.state.phase != Phase::Complete {
            return None;
        }
        let config = self.config?;

        Some(SessionHistory {
            id: Uuid::new_v4(),
            preset_id: preset.id,
            exercise_name: preset.name.clone(),
            mode: config.mode,
            date: self.state.completed_at.unwrap_or_else(|| self.clock.now()),
            accumulated_total: self.state.accumulated_total,
            target: config.target,
            rest_seconds: config.rest_seconds,
            adjustment: config.adjustment,
            attempt_count: self.state.attempts.len(),
            duration_seconds: self.duration_seconds(),
            attempts: self.state.attempts.clone(),
        })
    }

    fn require_phase(&self, op: &'static str, phase: Phase) -> Result<(), SessionError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                op,
                phase: self.state.phase,
            })
        }
    }

    fn training_config(
        &self,
        op: &'static str,
        mode: TrainingMode,
    ) -> Result<Configuration, SessionError> {
        self.require_phase(op, Phase::Training)?;
        let config = self.config.ok_or(SessionError::InvalidTransition {
            op,
            phase: self.state.phase,
        })?;
        if config.mode != mode {
            return Err(SessionError::WrongMode {
                op,
                mode: config.mode,
            });
        }
        Ok(config)
    }

    fn ensure_armed(&self) -> Result<(), SessionError> {
        let remaining = self.arming_remaining();
        if remaining.is_zero() {
            Ok(())
        } else {
            Err(SessionError::NotArmed { remaining })
        }
    }

    fn record(&mut self, raw: f64, adjustment: f64, counted: f64) {
        self.state.attempts.push(Attempt {
            raw_value: raw,
            adjustment,
            counted_value: counted,
            timestamp: self.clock.now(),
        });
        self.state.accumulated_total += counted;
        debug!(
            "attempt #{}: raw={raw} adjustment={adjustment} counted={counted} total={}",
            self.state.attempts.len(),
            self.state.accumulated_total
        );
    }

    fn advance_after_attempt(&mut self, config: &Configuration) -> Phase {
        if self.state.accumulated_total >= config.target {
            self.complete();
        } else {
            self.state.rest_remaining = config.rest_countdown();
            self.state.phase = Phase::Resting;
            self.training_entered_at = None;
            self.rest_epoch += 1;
        }
        self.state.phase
    }

    fn enter_training(&mut self) {
        self.state.phase = Phase::Training;
        self.state.rest_remaining = 0;
        self.training_entered_at = Some(self.clock.now());
        self.rest_epoch += 1;
    }

    fn complete(&mut self) {
        self.state.phase = Phase::Complete;
        self.state.completed_at = Some(self.clock.now());
        self.training_entered_at = None;
        info!(
            "session complete: total={} over {} attempts",
            self.state.accumulated_total,
            self.state.attempts.len()
        );
    }

    fn current_rest_token(&self) -> RestToken {
        RestToken(self.rest_epoch)
    }
}

fn check_raw(raw: f64) -> Result<(), SessionError> {
    if raw.is_finite() && raw >= 0.0 {
        Ok(())
    } else {
        Err(SessionError::InvalidValue(raw))
    }
}

fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualClock;
    use assert_matches::assert_matches;

    fn engine() -> (SessionEngine, ManualClock) {
        let clock = ManualClock::default();
        (SessionEngine::with_clock(Arc::new(clock.clone())), clock)
    }

    fn time_config() -> Configuration {
        Configuration::new(TrainingMode::Time, 60.0, 15, 5.0)
    }

    fn reps_config() -> Configuration {
        Configuration::new(TrainingMode::Reps, 20.0, 30, 2.0)
    }

    #[test]
    fn test_new_engine_is_in_setup() {
        let (engine, _) = engine();
        assert_eq!(engine.phase(), Phase::Setup);
        assert_eq!(engine.accumulated_total(), 0.0);
        assert!(engine.attempts().is_empty());
        assert!(engine.configuration().is_none());
    }

    #[test]
    fn test_start_session_initializes_state() {
        let (mut engine, _) = engine();
        assert_eq!(engine.start_session(time_config()), Ok(Phase::Training));
        assert_eq!(engine.accumulated_total(), 0.0);
        assert!(engine.attempts().is_empty());
        assert!(engine.state().started_at.is_some());
        assert_eq!(engine.configuration(), Some(&time_config()));
    }

    #[test]
    fn test_start_session_rejects_bad_config() {
        let (mut engine, _) = engine();

        let low_target = Configuration::new(TrainingMode::Time, 0.5, 15, 5.0);
        assert_matches!(
            engine.start_session(low_target),
            Err(SessionError::InvalidConfiguration(ConfigField::Target))
        );

        let negative_rest = Configuration::new(TrainingMode::Reps, 10.0, -1, 0.0);
        assert_matches!(
            engine.start_session(negative_rest),
            Err(SessionError::InvalidConfiguration(ConfigField::RestSeconds))
        );

        let negative_adjustment = Configuration::new(TrainingMode::Reps, 10.0, 0, -2.0);
        assert_matches!(
            engine.start_session(negative_adjustment),
            Err(SessionError::InvalidConfiguration(ConfigField::Adjustment))
        );

        let nan_target = Configuration::new(TrainingMode::Time, f64::NAN, 0, 0.0);
        assert!(engine.start_session(nan_target).is_err());

        assert_eq!(engine.phase(), Phase::Setup);
    }

    #[test]
    fn test_start_session_only_from_setup() {
        let (mut engine, _) = engine();
        engine.start_session(time_config()).unwrap();
        assert_matches!(
            engine.start_session(time_config()),
            Err(SessionError::InvalidTransition {
                phase: Phase::Training,
                ..
            })
        );
    }

    #[test]
    fn test_time_mode_scenario() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();

        clock.advance(Duration::from_secs(40));
        assert_eq!(engine.bail_out(40.0), Ok(Phase::Resting));
        assert_eq!(engine.attempts()[0].counted_value, 35.0);
        assert_eq!(engine.accumulated_total(), 35.0);
        assert_eq!(engine.rest_remaining(), 15);

        engine.skip_rest().unwrap();
        clock.advance(Duration::from_secs(30));
        assert_eq!(engine.bail_out(30.0), Ok(Phase::Complete));
        assert_eq!(engine.attempts()[1].counted_value, 25.0);
        assert_eq!(engine.accumulated_total(), 60.0);
    }

    #[test]
    fn test_reps_mode_scenario() {
        let (mut engine, _) = engine();
        engine.start_session(reps_config()).unwrap();

        assert_eq!(engine.done_with_set(10.0), Ok(Phase::Resting));
        assert_eq!(engine.attempts()[0].counted_value, 12.0);
        assert_eq!(engine.accumulated_total(), 12.0);
        assert_eq!(engine.rest_remaining(), 30);

        engine.skip_rest().unwrap();
        assert_eq!(engine.done_with_set(9.0), Ok(Phase::Complete));
        assert_eq!(engine.attempts()[1].counted_value, 11.0);
        assert_eq!(engine.accumulated_total(), 23.0);
    }

    #[test]
    fn test_bail_out_floors_counted_value_at_zero() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(2));

        engine.bail_out(3.0).unwrap();
        let attempt = &engine.attempts()[0];
        assert_eq!(attempt.raw_value, 3.0);
        assert_eq!(attempt.adjustment, 5.0);
        assert_eq!(attempt.counted_value, 0.0);
        assert_eq!(engine.accumulated_total(), 0.0);
    }

    #[test]
    fn test_bail_out_counted_value_over_range() {
        for adjustment in [0.0, 1.5, 5.0, 12.0] {
            for raw in [0.0, 1.0, 4.9, 5.0, 17.25, 90.0] {
                let (mut engine, clock) = engine();
                engine
                    .start_session(Configuration::new(TrainingMode::Time, 1000.0, 0, adjustment))
                    .unwrap();
                clock.advance(Duration::from_secs(1));
                engine.bail_out(raw).unwrap();

                let expected = (raw - adjustment).max(0.0);
                assert_eq!(engine.attempts()[0].counted_value, expected);
                assert_eq!(engine.accumulated_total(), expected);
            }
        }
    }

    #[test]
    fn test_stop_completes_without_adjustment() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(10));

        assert_eq!(engine.stop(10.0), Ok(Phase::Complete));
        let attempt = &engine.attempts()[0];
        assert_eq!(attempt.adjustment, 0.0);
        assert_eq!(attempt.counted_value, 10.0);
        assert_eq!(engine.accumulated_total(), 10.0);
        assert!(!engine.target_reached());
    }

    #[test]
    fn test_stop_after_rest_cycle_keeps_prior_attempts() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(20));
        engine.bail_out(20.0).unwrap();
        engine.skip_rest().unwrap();
        clock.advance(Duration::from_secs(50));

        engine.stop(50.0).unwrap();
        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.accumulated_total(), 65.0);
        assert_eq!(engine.attempts().len(), 2);
    }

    #[test]
    fn test_bail_and_stop_rejected_before_arming() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();

        clock.advance(Duration::from_millis(400));
        assert_matches!(engine.bail_out(0.4), Err(SessionError::NotArmed { .. }));
        assert_matches!(engine.stop(0.4), Err(SessionError::NotArmed { .. }));
        assert!(!engine.is_armed());
        assert!(engine.attempts().is_empty());
        assert_eq!(engine.phase(), Phase::Training);

        clock.advance(Duration::from_millis(600));
        assert!(engine.is_armed());
        assert!(engine.bail_out(1.0).is_ok());
    }

    #[test]
    fn test_arming_restarts_after_rest() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(10));
        engine.bail_out(10.0).unwrap();
        engine.skip_rest().unwrap();

        assert_matches!(engine.bail_out(0.1), Err(SessionError::NotArmed { .. }));
        clock.advance(Duration::from_secs(1));
        assert!(engine.bail_out(12.0).is_ok());
    }

    #[test]
    fn test_custom_arming_delay() {
        let clock = ManualClock::default();
        let mut engine =
            SessionEngine::with_clock(Arc::new(clock.clone())).arming_delay(Duration::ZERO);
        engine.start_session(time_config()).unwrap();
        assert!(engine.is_armed());
        assert!(engine.stop(0.0).is_ok());
    }

    #[test]
    fn test_done_with_set_is_not_armed_gated() {
        let (mut engine, _) = engine();
        engine.start_session(reps_config()).unwrap();
        assert!(engine.done_with_set(3.0).is_ok());
    }

    #[test]
    fn test_mode_guards() {
        let (mut engine, clock) = engine();
        engine.start_session(reps_config()).unwrap();
        clock.advance(Duration::from_secs(5));
        assert_matches!(
            engine.bail_out(5.0),
            Err(SessionError::WrongMode {
                mode: TrainingMode::Reps,
                ..
            })
        );
        assert_matches!(engine.stop(5.0), Err(SessionError::WrongMode { .. }));

        engine.reset();
        engine.start_session(time_config()).unwrap();
        assert_matches!(
            engine.done_with_set(5.0),
            Err(SessionError::WrongMode {
                mode: TrainingMode::Time,
                ..
            })
        );
    }

    #[test]
    fn test_attempts_rejected_outside_training() {
        let (mut engine, _) = engine();
        assert_matches!(
            engine.done_with_set(1.0),
            Err(SessionError::InvalidTransition {
                phase: Phase::Setup,
                ..
            })
        );

        engine.start_session(reps_config()).unwrap();
        engine.done_with_set(1.0).unwrap();
        assert_matches!(
            engine.done_with_set(1.0),
            Err(SessionError::InvalidTransition {
                phase: Phase::Resting,
                ..
            })
        );
    }

    #[test]
    fn test_invalid_raw_values_change_nothing() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(2));

        assert_matches!(engine.bail_out(-1.0), Err(SessionError::InvalidValue(_)));
        assert_matches!(engine.stop(f64::INFINITY), Err(SessionError::InvalidValue(_)));
        assert!(engine.attempts().is_empty());
        assert_eq!(engine.phase(), Phase::Training);
    }

    #[test]
    fn test_rest_ticks_count_down_and_return_to_training() {
        let (mut engine, _) = engine();
        engine
            .start_session(Configuration::new(TrainingMode::Reps, 20.0, 5, 0.0))
            .unwrap();
        engine.done_with_set(4.0).unwrap();
        let token = engine.rest_token().unwrap();

        let cues: Vec<(u32, Option<Cue>)> = (0..5)
            .map(|_| {
                let tick = engine.rest_tick(token).unwrap();
                (tick.remaining, tick.cue)
            })
            .collect();

        assert_eq!(
            cues,
            vec![
                (4, None),
                (3, None),
                (2, Some(Cue::Warning)),
                (1, None),
                (0, Some(Cue::Finished)),
            ]
        );
        assert_eq!(engine.phase(), Phase::Training);
        assert_eq!(engine.rest_token(), None);
    }

    #[test]
    fn test_zero_rest_finishes_on_first_tick() {
        let (mut engine, _) = engine();
        engine
            .start_session(Configuration::new(TrainingMode::Reps, 20.0, 0, 0.0))
            .unwrap();
        engine.done_with_set(4.0).unwrap();
        assert_eq!(engine.phase(), Phase::Resting);
        assert_eq!(engine.rest_remaining(), 0);

        let token = engine.rest_token().unwrap();
        let tick = engine.rest_tick(token).unwrap();
        assert_eq!(tick.cue, Some(Cue::Finished));
        assert_eq!(tick.phase, Phase::Training);
    }

    #[test]
    fn test_stale_tick_after_skip_is_ignored() {
        let (mut engine, _) = engine();
        engine.start_session(reps_config()).unwrap();
        engine.done_with_set(2.0).unwrap();
        let first_rest = engine.rest_token().unwrap();

        engine.skip_rest().unwrap();
        assert_eq!(engine.phase(), Phase::Training);
        assert_matches!(
            engine.rest_tick(first_rest),
            Err(SessionError::InvalidTransition { .. })
        );

        engine.done_with_set(2.0).unwrap();
        assert_eq!(engine.phase(), Phase::Resting);
        assert_matches!(engine.rest_tick(first_rest), Err(SessionError::StaleTick));
        assert_eq!(engine.rest_remaining(), 30);

        let second_rest = engine.rest_token().unwrap();
        assert_ne!(first_rest, second_rest);
        assert_eq!(engine.rest_tick(second_rest).unwrap().remaining, 29);
    }

    #[test]
    fn test_skip_rest_only_from_resting() {
        let (mut engine, _) = engine();
        assert!(engine.skip_rest().is_err());
        engine.start_session(reps_config()).unwrap();
        assert!(engine.skip_rest().is_err());
    }

    #[test]
    fn test_reset_from_every_phase() {
        let (mut engine, clock) = engine();
        assert_eq!(engine.reset(), Phase::Setup);

        engine.start_session(reps_config()).unwrap();
        engine.reset();
        assert_eq!(engine.phase(), Phase::Setup);

        engine.start_session(reps_config()).unwrap();
        engine.done_with_set(3.0).unwrap();
        assert_eq!(engine.phase(), Phase::Resting);
        engine.reset();
        assert_eq!(engine.phase(), Phase::Setup);
        assert!(engine.attempts().is_empty());
        assert_eq!(engine.accumulated_total(), 0.0);
        assert_eq!(engine.rest_remaining(), 0);

        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(3));
        engine.stop(3.0).unwrap();
        engine.reset();
        assert_eq!(engine.state(), &SessionState::default());
        assert!(engine.configuration().is_none());
    }

    #[test]
    fn test_total_matches_sum_of_attempts() {
        let (mut engine, clock) = engine();
        engine
            .start_session(Configuration::new(TrainingMode::Time, 100.0, 10, 2.5))
            .unwrap();

        for raw in [12.0, 1.0, 30.5, 8.25] {
            clock.advance(Duration::from_secs(2));
            engine.bail_out(raw).unwrap();
            let sum: f64 = engine.attempts().iter().map(|a| a.counted_value).sum();
            assert_eq!(engine.accumulated_total(), sum);
            engine.skip_rest().unwrap();
        }
    }

    #[test]
    fn test_live_view_helpers() {
        let (mut engine, clock) = engine();
        engine.start_session(time_config()).unwrap();
        clock.advance(Duration::from_secs(25));

        assert_eq!(engine.current_hold_seconds(), 25.0);
        assert_eq!(engine.live_total(25.0), 20.0);
        assert_eq!(engine.remaining_to_target(), 60.0);

        engine.bail_out(25.0).unwrap();
        assert_eq!(engine.remaining_to_target(), 40.0);
        assert!((engine.progress() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(engine.current_hold_seconds(), 0.0);
    }

    #[test]
    fn test_history_only_when_complete() {
        let (mut engine, clock) = engine();
        let preset = Preset::new("Pull-ups", reps_config());
        engine.start_session(reps_config()).unwrap();
        assert!(engine.history(&preset).is_none());

        clock.advance(Duration::from_secs(40));
        engine.done_with_set(10.0).unwrap();
        engine.skip_rest().unwrap();
        clock.advance(Duration::from_secs(50));
        engine.done_with_set(9.0).unwrap();

        let history = engine.history(&preset).unwrap();
        assert_eq!(history.preset_id, preset.id);
        assert_eq!(history.exercise_name, "Pull-ups");
        assert_eq!(history.mode, TrainingMode::Reps);
        assert_eq!(history.accumulated_total, 23.0);
        assert_eq!(history.target, 20.0);
        assert_eq!(history.attempt_count, 2);
        assert_eq!(history.duration_seconds, 90);
        assert_eq!(history.attempts.len(), 2);
    }

    #[test]
    fn test_mode_parsing_and_display() {
        assert_eq!("time".parse::<TrainingMode>(), Ok(TrainingMode::Time));
        assert_eq!(" Reps ".parse::<TrainingMode>(), Ok(TrainingMode::Reps));
        assert!("sets".parse::<TrainingMode>().is_err());
        assert_eq!(TrainingMode::Time.to_string(), "time");
        assert_eq!(
            serde_json::to_string(&TrainingMode::Reps).unwrap(),
            "\"reps\""
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SessionError::InvalidConfiguration(ConfigField::Target).to_string(),
            "invalid configuration: target must be at least 1"
        );
        assert_eq!(
            SessionError::InvalidTransition {
                op: "skip rest",
                phase: Phase::Training
            }
            .to_string(),
            "cannot skip rest while in Training phase"
        );
    }
}
