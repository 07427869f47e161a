//! Session - Level pacing for one running simulation
//!
//! The LevelClock tracks the current level and how much time is left.
//! The SessionContext wraps the clock together with the last level the
//! score engine saw, so a level change can be detected exactly once.
//!
//! There is no terminal state: the clock keeps running until the host
//! stops polling it.

use std::collections::BTreeSet;

use super::action::Contribution;

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Whole seconds from `earlier` to self, zero if `earlier` is later
    pub fn seconds_since(&self, earlier: Timestamp) -> u64 {
        let millis = self.0.saturating_sub(earlier.0);
        if millis <= 0 {
            0
        } else {
            (millis / 1000) as u64
        }
    }
}

/// Source of the current time (PORT)
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Level duration as a step function of the level number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSchedule {
    /// (from_level, seconds), sorted by from_level
    steps: Vec<(u32, u64)>,
}

impl LevelSchedule {
    /// Build from (from_level, seconds) steps. Levels below the first
    /// step use the first step.
    pub fn new(steps: impl IntoIterator<Item = (u32, u64)>) -> Result<Self, LevelError> {
        let mut steps: Vec<(u32, u64)> = steps.into_iter().collect();
        if steps.is_empty() {
            return Err(LevelError::EmptySchedule);
        }
        steps.sort_by_key(|(from, _)| *from);
        Ok(Self { steps })
    }

    /// One duration for every level
    pub fn uniform(seconds: u64) -> Self {
        Self {
            steps: vec![(1, seconds)],
        }
    }

    pub fn duration_for(&self, level: u32) -> u64 {
        self.steps
            .iter()
            .rev()
            .find(|(from, _)| *from <= level)
            .or_else(|| self.steps.first())
            .map(|(_, seconds)| *seconds)
            .unwrap_or(0)
    }
}

/// Clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Running,
    /// Level just changed; cleared by the first score reading
    Transitioning,
}

/// Snapshot of the clock at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelReading {
    pub level: u32,
    pub total_duration: u64,
    pub time_left: u64,
    /// total_duration - time_left
    pub elapsed: u64,
}

/// Tracks level, start time and remaining time
#[derive(Debug, Clone)]
pub struct LevelClock {
    current_level: u32,
    level_start: Timestamp,
    schedule: LevelSchedule,
    state: ClockState,
}

impl LevelClock {
    pub fn new(level: u32, schedule: LevelSchedule, now: Timestamp) -> Result<Self, LevelError> {
        if level == 0 {
            return Err(LevelError::InvalidLevel { level });
        }
        Ok(Self {
            current_level: level,
            level_start: now,
            schedule,
            state: ClockState::Running,
        })
    }

    // ========== Getters ==========

    pub fn level(&self) -> u32 {
        self.current_level
    }

    pub fn level_start(&self) -> Timestamp {
        self.level_start
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn total_duration(&self) -> u64 {
        self.schedule.duration_for(self.current_level)
    }

    /// Remaining seconds, never negative
    pub fn time_left(&self, now: Timestamp) -> u64 {
        self.total_duration()
            .saturating_sub(now.seconds_since(self.level_start))
    }

    pub fn reading(&self, now: Timestamp) -> LevelReading {
        let total_duration = self.total_duration();
        let time_left = self.time_left(now);
        LevelReading {
            level: self.current_level,
            total_duration,
            time_left,
            elapsed: total_duration - time_left,
        }
    }

    // ========== State Transitions ==========

    /// Move to level `level` and restart the timer
    pub fn advance_level(&mut self, level: u32, now: Timestamp) -> Result<(), LevelError> {
        if level == 0 {
            return Err(LevelError::InvalidLevel { level });
        }
        self.current_level = level;
        self.level_start = now;
        self.state = ClockState::Transitioning;
        Ok(())
    }

    /// Restart the timer on the same level (retry)
    pub fn reset(&mut self, now: Timestamp) {
        self.level_start = now;
    }

    fn settle(&mut self) {
        self.state = ClockState::Running;
    }
}

/// What the score engine needs from the session for one computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWindow {
    pub reading: LevelReading,
    /// Level differs from the one seen by the previous computation
    pub level_changed: bool,
}

/// What happened during the current attempt at a level.
///
/// Cleared whenever the level advances or is retried.
#[derive(Debug, Clone, Default)]
pub struct AttemptLog {
    fired_categories: BTreeSet<String>,
    outcome_emitted: bool,
    contributions: Vec<Contribution>,
}

impl AttemptLog {
    /// Remember that a category's follow-ups ran. True the first time.
    pub fn mark_fired(&mut self, category: &str) -> bool {
        self.fired_categories.insert(category.to_string())
    }

    pub fn has_fired(&self, category: &str) -> bool {
        self.fired_categories.contains(category)
    }

    /// Remember that an outcome was published. True the first time.
    pub fn mark_outcome_emitted(&mut self) -> bool {
        !std::mem::replace(&mut self.outcome_emitted, true)
    }

    pub fn outcome_emitted(&self) -> bool {
        self.outcome_emitted
    }

    pub fn record(&mut self, contributions: impl IntoIterator<Item = Contribution>) {
        self.contributions.extend(contributions);
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }
}

/// Per-session level state, owned by one coordinator and passed into
/// component calls
#[derive(Debug, Clone)]
pub struct SessionContext {
    clock: LevelClock,
    last_known_level: u32,
    attempt: AttemptLog,
    /// Bumped on every advance and retry
    attempt_number: u64,
}

impl SessionContext {
    pub fn new(clock: LevelClock) -> Self {
        let last_known_level = clock.level();
        Self {
            clock,
            last_known_level,
            attempt: AttemptLog::default(),
            attempt_number: 0,
        }
    }

    pub fn clock(&self) -> &LevelClock {
        &self.clock
    }

    pub fn attempt(&self) -> &AttemptLog {
        &self.attempt
    }

    pub fn attempt_mut(&mut self) -> &mut AttemptLog {
        &mut self.attempt
    }

    /// Move to another level and start a fresh attempt
    pub fn advance_level(&mut self, level: u32, now: Timestamp) -> Result<(), LevelError> {
        self.clock.advance_level(level, now)?;
        self.start_attempt();
        Ok(())
    }

    /// Retry the current level
    pub fn retry(&mut self, now: Timestamp) {
        self.clock.reset(now);
        self.start_attempt();
    }

    fn start_attempt(&mut self) {
        self.attempt = AttemptLog::default();
        self.attempt_number += 1;
    }

    /// Identifies the current attempt; work started under another
    /// number belongs to an attempt that is over
    pub fn attempt_number(&self) -> u64 {
        self.attempt_number
    }

    pub fn level(&self) -> u32 {
        self.clock.level()
    }

    pub fn last_known_level(&self) -> u32 {
        self.last_known_level
    }

    /// Read the clock for a score computation.
    ///
    /// Reports a level change once, then remembers the new level.
    pub fn take_scoring_window(&mut self, now: Timestamp) -> ScoringWindow {
        let reading = self.clock.reading(now);
        let level_changed = reading.level != self.last_known_level
            || self.clock.state() == ClockState::Transitioning;
        self.last_known_level = reading.level;
        self.clock.settle();
        ScoringWindow {
            reading,
            level_changed,
        }
    }
}

/// Errors from level pacing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    InvalidLevel { level: u32 },
    EmptySchedule,
}

impl core::fmt::Display for LevelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LevelError::InvalidLevel { level } => {
                write!(f, "Invalid level {}: levels start at 1", level)
            }
            LevelError::EmptySchedule => write!(f, "Level schedule has no steps"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(seconds: i64) -> Timestamp {
        Timestamp::from_millis(seconds * 1000)
    }

    #[test]
    fn test_schedule_step_function() {
        let schedule = LevelSchedule::new([(3, 600), (1, 300)]).unwrap();

        assert_eq!(schedule.duration_for(1), 300);
        assert_eq!(schedule.duration_for(2), 300);
        assert_eq!(schedule.duration_for(3), 600);
        assert_eq!(schedule.duration_for(9), 600);
        assert!(LevelSchedule::new([]).is_err());
    }

    #[test]
    fn test_time_left_floors_at_zero() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();

        assert_eq!(clock.time_left(t(0)), 300);
        assert_eq!(clock.time_left(t(185)), 115);
        assert_eq!(clock.time_left(t(10_000)), 0);
        // Clock skew backwards never adds time
        assert_eq!(clock.time_left(t(-50)), 300);
    }

    #[test]
    fn test_partial_seconds_are_floored() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();
        assert_eq!(clock.time_left(Timestamp::from_millis(1_999)), 299);
    }

    #[test]
    fn test_reading_elapsed() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();
        let reading = clock.reading(t(185));

        assert_eq!(reading.elapsed, 185);
        assert_eq!(reading.time_left, 115);
        assert_eq!(clock.reading(t(400)).elapsed, 300);
    }

    #[test]
    fn test_advance_and_reset() {
        let schedule = LevelSchedule::new([(1, 300), (3, 600)]).unwrap();
        let mut clock = LevelClock::new(1, schedule, t(0)).unwrap();

        clock.advance_level(3, t(100)).unwrap();
        assert_eq!(clock.level(), 3);
        assert_eq!(clock.state(), ClockState::Transitioning);
        assert_eq!(clock.time_left(t(100)), 600);

        clock.reset(t(400));
        assert_eq!(clock.level(), 3);
        assert_eq!(clock.time_left(t(400)), 600);

        assert!(clock.advance_level(0, t(500)).is_err());
    }

    #[test]
    fn test_level_change_reported_once() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();
        let mut session = SessionContext::new(clock);

        assert!(!session.take_scoring_window(t(1)).level_changed);

        session.advance_level(2, t(2)).unwrap();
        let window = session.take_scoring_window(t(3));
        assert!(window.level_changed);
        assert_eq!(window.reading.level, 2);
        assert_eq!(session.last_known_level(), 2);
        assert_eq!(session.clock().state(), ClockState::Running);

        assert!(!session.take_scoring_window(t(4)).level_changed);
    }

    #[test]
    fn test_retry_is_not_a_level_change() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();
        let mut session = SessionContext::new(clock);

        session.retry(t(50));
        assert!(!session.take_scoring_window(t(51)).level_changed);
        assert_eq!(session.clock().time_left(t(51)), 299);
    }

    #[test]
    fn test_attempt_log_cleared_on_advance_and_retry() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();
        let mut session = SessionContext::new(clock);

        assert!(session.attempt_mut().mark_fired("PublicVictimSupport"));
        assert!(!session.attempt_mut().mark_fired("PublicVictimSupport"));
        assert!(session.attempt_mut().mark_outcome_emitted());
        assert!(!session.attempt_mut().mark_outcome_emitted());

        session.retry(t(10));
        assert!(!session.attempt().has_fired("PublicVictimSupport"));
        assert!(!session.attempt().outcome_emitted());

        session.attempt_mut().mark_fired("A");
        session.advance_level(2, t(20)).unwrap();
        assert!(!session.attempt().has_fired("A"));
    }

    #[test]
    fn test_attempt_number_moves_on_advance_and_retry() {
        let clock = LevelClock::new(1, LevelSchedule::uniform(300), t(0)).unwrap();
        let mut session = SessionContext::new(clock);
        let first = session.attempt_number();

        session.take_scoring_window(t(5));
        assert_eq!(session.attempt_number(), first);

        session.retry(t(10));
        let second = session.attempt_number();
        assert_ne!(second, first);

        assert!(session.advance_level(0, t(15)).is_err());
        assert_eq!(session.attempt_number(), second);

        session.advance_level(2, t(20)).unwrap();
        assert_ne!(session.attempt_number(), second);
    }
}
