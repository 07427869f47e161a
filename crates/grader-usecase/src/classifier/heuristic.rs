//! Rule-based stage for the identity-disclosure category
//!
//! A 1:1 chat that asks who leaked or shared something, sent to one of
//! the category's agents, is a match even when the service misses it.

use async_trait::async_trait;
use grader_domain::{Action, ActionKind, CategoryMatch, RuleSet};
use regex::Regex;

use super::Classifier;
use crate::error::{ClassifierError, EngineError};

#[derive(Debug, Clone)]
pub struct DisclosureHeuristic {
    category: String,
    pattern: Regex,
}

impl DisclosureHeuristic {
    pub fn new(category: impl Into<String>, pattern: &str) -> Result<Self, EngineError> {
        let pattern = Regex::new(pattern).map_err(|e| EngineError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            category: category.into(),
            pattern,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Synchronous core, also used directly by tests
    pub fn matches(&self, actions: &[Action], rules: &RuleSet) -> Vec<CategoryMatch> {
        let Some(category) = rules.find(&self.category) else {
            return Vec::new();
        };
        let agents = category.agents();
        if agents.is_empty() {
            return Vec::new();
        }

        actions
            .iter()
            .filter(|a| a.kind == ActionKind::DirectChat && self.pattern.is_match(&a.text))
            .filter_map(|action| {
                let affected: Vec<String> = agents
                    .iter()
                    .filter(|agent| action.addresses(agent))
                    .cloned()
                    .collect();
                (!affected.is_empty()).then(|| {
                    CategoryMatch::new(action.id.clone(), self.category.clone(), affected)
                })
            })
            .collect()
    }
}

#[async_trait]
impl Classifier for DisclosureHeuristic {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn classify(
        &self,
        actions: &[Action],
        rules: &RuleSet,
    ) -> Result<Vec<CategoryMatch>, ClassifierError> {
        Ok(self.matches(actions, rules))
    }
}
