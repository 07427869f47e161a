//! # Grader Domain Layer
//!
//! The heart of the grader - pure scoring logic with zero external dependencies.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (This Crate)                     │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │  model/     - Entities & Value Objects                      ││
//! │  │  repository/- Trait definitions (not implementations)       ││
//! │  │  service/   - Domain services (ScoreEngine, DeltaApplier)   ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Golden Rule
//!
//! **This crate has ZERO external dependencies.**
//!
//! If the classification service changes, this crate doesn't change.
//! If the document store changes, this crate doesn't change.
//! Time comes in through the `Clock` port, never from the system.

pub mod model;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use model::{
    action::{Action, ActionId, ActionKind, CategoryMatch, Contribution, Participant, ParticipantKind},
    agent::{Agent, AgentId, AgentRole},
    attribute::{Attribute, AttributeDomain, Traits},
    category::{Category, Delta, NextStep, RuleBook, RuleSet},
    objective::{Objective, ObjectiveId, TaskType},
    score::{DecayPolicy, ScoreSnapshot, ScoreWeights},
    session::{
        AttemptLog, Clock, ClockState, LevelClock, LevelError, LevelReading, LevelSchedule,
        ScoringWindow, SessionContext, Timestamp,
    },
};

pub use repository::{
    agent_repository::{AgentRepository, RepositoryError},
    objective_repository::ObjectiveRepository,
    stats_repository::{SnapshotRecord, StatsRepository},
};

pub use service::{
    delta_applier::{DeltaApplier, DeltaEvent, DeltaOutcome},
    impact::{ActionImpact, ImpactAnalyzer},
    objective_tracker::{ObjectiveEvent, ObjectiveTracker},
    score_engine::ScoreEngine,
};
