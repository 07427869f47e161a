//! Action Classifier - An ordered chain of pluggable stages
//!
//! ```text
//! actions ──▶ [service stage] ──┐
//!         └─▶ [heuristic stage] ┴─▶ merge (first (actionId, category) wins)
//! ```
//!
//! A failing stage contributes nothing. The chain itself never fails.

pub mod heuristic;
pub mod response;
pub mod service;

use std::collections::HashSet;

use async_trait::async_trait;
use grader_domain::{Action, ActionId, CategoryMatch, RuleSet};
use tracing::{debug, warn};

use crate::error::ClassifierError;

pub use heuristic::DisclosureHeuristic;
pub use service::ServiceClassifier;

/// One classification stage
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(
        &self,
        actions: &[Action],
        rules: &RuleSet,
    ) -> Result<Vec<CategoryMatch>, ClassifierError>;
}

/// De-duplicate by (actionId, category), keeping the first occurrence
pub fn merge_matches(batches: impl IntoIterator<Item = Vec<CategoryMatch>>) -> Vec<CategoryMatch> {
    let mut seen: HashSet<(ActionId, String)> = HashSet::new();
    let mut merged = Vec::new();
    for matched in batches.into_iter().flatten() {
        let (action_id, category) = matched.key();
        if seen.insert((action_id.clone(), category.to_string())) {
            merged.push(matched);
        }
    }
    merged
}

/// What the chain produced for one batch
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub matches: Vec<CategoryMatch>,
    /// (stage name, error) for every stage that failed open
    pub failures: Vec<(String, ClassifierError)>,
}

#[derive(Default)]
pub struct ClassifierChain {
    stages: Vec<Box<dyn Classifier>>,
}

impl ClassifierChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a stage; earlier stages win de-duplication
    pub fn with_stage(mut self, stage: impl Classifier + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn classify(&self, actions: &[Action], rules: &RuleSet) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();
        let mut batches = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            match stage.classify(actions, rules).await {
                Ok(matches) => {
                    debug!(stage = stage.name(), matches = matches.len(), "Classifier stage done");
                    batches.push(matches);
                }
                Err(err) => {
                    warn!(stage = stage.name(), error = %err, "Classifier stage failed, treating as no matches");
                    outcome.failures.push((stage.name().to_string(), err));
                }
            }
        }

        outcome.matches = merge_matches(batches);
        outcome
    }
}
