//! # Grader Use Case Layer
//!
//! Application services around the domain: turning change records into
//! actions, classifying them, applying their effects, broadcasting
//! scores and pacing levels.
//! This layer orchestrates the flow of data between the domain and adapters.

pub mod broadcast;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod grading_cycle;
pub mod level_control;
pub mod normalizer;
pub mod outcome;
pub mod pending;
pub mod port;
pub mod session;

#[cfg(test)]
mod testing;

pub use grader_domain;

// Re-exports
pub use broadcast::ScoreBroadcaster;
pub use classifier::{
    merge_matches, ChainOutcome, Classifier, ClassifierChain, DisclosureHeuristic,
    ServiceClassifier,
};
pub use engine::{default_chain, level_schedule, GradingEngine, Stores};
pub use error::{ClassifierError, EngineError, Result};
pub use grading_cycle::{CycleReport, GradingCycle};
pub use level_control::{LevelController, ResetReport};
pub use normalizer::{ActionNormalizer, ChangeRecord, DocumentId};
pub use outcome::{OutcomePolicy, ThresholdPolicy};
pub use pending::PendingQueue;
pub use port::{
    ClassificationRequest, ClassificationService, EngineEvent, EventPublisher, FollowUpEvent,
    HarmfulAction, LevelOutcomeEvent, ObjectiveCompletedEvent, Outcome, ScoreUpdate,
};
pub use session::SharedSession;
