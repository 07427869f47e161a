//! Score - The composite wellbeing metrics computed from agent state
//!
//! A ScoreSnapshot is output, never the source of truth. It is rebuilt
//! from the agent store on every broadcast tick.

use std::collections::BTreeMap;

/// Weights of the three sub-scores in the health score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub bystander: f64,
    pub victim_support: f64,
    pub bully: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            bystander: 0.3,
            victim_support: 0.4,
            bully: 0.3,
        }
    }
}

/// One health point lost per `rate_seconds` of elapsed level time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayPolicy {
    rate_seconds: u64,
}

impl DecayPolicy {
    /// A zero rate is treated as one second
    pub fn new(rate_seconds: u64) -> Self {
        Self {
            rate_seconds: rate_seconds.max(1),
        }
    }

    pub fn rate_seconds(&self) -> u64 {
        self.rate_seconds
    }

    pub fn penalty(&self, elapsed_seconds: u64) -> u64 {
        elapsed_seconds / self.rate_seconds
    }
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Published scores at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSnapshot {
    /// Mean normalized bystander intention, [0, 1]
    pub bystander_score: f64,
    /// Mean normalized bully score (higher = less antisocial), [0, 1]
    pub bully_score: f64,
    /// [0, 1]
    pub victim_support_score: f64,
    /// Composite after decay, [0, 100]
    pub health_score: u32,
    /// Composite before decay
    pub raw_health_score: u32,
    /// Decay points subtracted
    pub decay: u64,
    pub time_left: u64,
    pub level: u32,
    /// username -> normalized score
    pub bystander_scores: BTreeMap<String, f64>,
    /// username -> normalized score
    pub bully_scores: BTreeMap<String, f64>,
}

impl ScoreSnapshot {
    pub fn is_expired(&self) -> bool {
        self.time_left == 0
    }
}
