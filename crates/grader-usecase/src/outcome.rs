//! Level outcome policy
//!
//! Decides from a snapshot whether the current attempt is won or lost.
//! The broadcaster makes sure an attempt reports at most one outcome.

use grader_domain::ScoreSnapshot;

use crate::port::Outcome;

pub trait OutcomePolicy: Send + Sync {
    fn decide(&self, snapshot: &ScoreSnapshot) -> Option<Outcome>;
}

/// Win at a health threshold, lose when time runs out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdPolicy {
    /// None: a level can only end by running out of time
    pub win_threshold: Option<u32>,
}

impl ThresholdPolicy {
    pub fn new(win_threshold: Option<u32>) -> Self {
        Self { win_threshold }
    }
}

impl OutcomePolicy for ThresholdPolicy {
    fn decide(&self, snapshot: &ScoreSnapshot) -> Option<Outcome> {
        if let Some(threshold) = self.win_threshold {
            if snapshot.health_score >= threshold {
                return Some(Outcome::Win);
            }
        }
        snapshot.is_expired().then_some(Outcome::Lose)
    }
}
