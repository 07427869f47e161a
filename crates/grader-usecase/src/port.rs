//! Ports to the outside world (classification service, subscribers)
//!
//! Adapters implement these; the use-case layer only sees the traits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use grader_domain::{ActionImpact, NextStep, ScoreSnapshot};
use serde::Serialize;

use crate::error::ClassifierError;

/// One request to the semantic classification service
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRequest {
    /// Instruction contract (system message)
    pub instructions: String,
    /// Actions and categories (user message)
    pub payload: serde_json::Value,
}

/// Semantic classification service (PORT)
///
/// Returns the raw text reply; parsing happens on our side of the
/// boundary.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifierError>;
}

/// Score snapshot as broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub bystander_score: f64,
    pub bully_score: f64,
    pub victim_support_score: f64,
    pub health_score: u32,
    pub time_left: u64,
    pub level: u32,
    pub bystander_scores: BTreeMap<String, f64>,
    pub bully_scores: BTreeMap<String, f64>,
}

impl From<&ScoreSnapshot> for ScoreUpdate {
    fn from(snapshot: &ScoreSnapshot) -> Self {
        Self {
            bystander_score: snapshot.bystander_score,
            bully_score: snapshot.bully_score,
            victim_support_score: snapshot.victim_support_score,
            health_score: snapshot.health_score,
            time_left: snapshot.time_left,
            level: snapshot.level,
            bystander_scores: snapshot.bystander_scores.clone(),
            bully_scores: snapshot.bully_scores.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
}

/// An action that pushed scores the wrong way
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmfulAction {
    pub action_id: String,
    pub harm: f64,
    pub categories: Vec<String>,
}

impl From<&ActionImpact> for HarmfulAction {
    fn from(impact: &ActionImpact) -> Self {
        Self {
            action_id: impact.action_id.as_str().to_string(),
            harm: impact.harm,
            categories: impact.categories.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOutcomeEvent {
    pub outcome: Outcome,
    pub level: u32,
    pub health_score: u32,
    /// Most harmful actions first; empty for wins
    pub feedback: Vec<HarmfulAction>,
}

/// Scripted follow-up for the collaborator that posts content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpEvent {
    pub level: u32,
    pub category: String,
    pub kind: String,
    pub agent: String,
    pub content: String,
}

impl FollowUpEvent {
    pub fn new(level: u32, category: &str, step: &NextStep) -> Self {
        Self {
            level,
            category: category.to_string(),
            kind: step.kind.clone(),
            agent: step.agent.clone(),
            content: step.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveCompletedEvent {
    pub level: u32,
    pub objective_id: String,
    pub label: String,
}

/// Everything the engine publishes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    ScoreUpdate(ScoreUpdate),
    LevelOutcome(LevelOutcomeEvent),
    FollowUp(FollowUpEvent),
    ObjectiveCompleted(ObjectiveCompletedEvent),
}

impl EngineEvent {
    /// Wire name, as written in the `event` tag
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::ScoreUpdate(_) => "scoreUpdate",
            EngineEvent::LevelOutcome(_) => "levelOutcome",
            EngineEvent::FollowUp(_) => "followUp",
            EngineEvent::ObjectiveCompleted(_) => "objectiveCompleted",
        }
    }
}

/// Fan-out to current subscribers (PORT)
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: EngineEvent);
}
