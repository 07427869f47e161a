//! Category - A named class of social effect (a "solution" rule)
//!
//! Categories are Value Objects loaded once per level and never
//! changed while the level runs.

use std::collections::BTreeMap;

use super::attribute::Attribute;

/// Signed change to one attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub attribute: Attribute,
    pub value: f64,
}

impl Delta {
    pub fn new(attribute: Attribute, value: f64) -> Self {
        Self { attribute, value }
    }
}

/// Scripted side effect run after a category first matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStep {
    /// e.g. "comment" or "chat"
    pub kind: String,
    /// Agent that performs the step (may be empty)
    pub agent: String,
    pub content: String,
}

/// A classification rule
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    level: u32,
    name: String,
    description: String,
    deltas: Vec<Delta>,
    /// Older rule files carry one number instead of field deltas
    aggregate_delta: Option<f64>,
    next_steps: Vec<NextStep>,
    /// Agents this rule is about
    agents: Vec<String>,
}

impl Category {
    pub fn new(level: u32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            description: description.into(),
            deltas: Vec::new(),
            aggregate_delta: None,
            next_steps: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// Builder: add a field delta
    pub fn with_delta(mut self, attribute: Attribute, value: f64) -> Self {
        self.deltas.push(Delta::new(attribute, value));
        self
    }

    /// Builder: legacy aggregate delta
    pub fn with_aggregate_delta(mut self, value: f64) -> Self {
        self.aggregate_delta = Some(value);
        self
    }

    /// Builder: add a scripted follow-up
    pub fn with_next_step(mut self, step: NextStep) -> Self {
        self.next_steps.push(step);
        self
    }

    /// Builder: add agents this rule is about
    pub fn with_agents(mut self, agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.agents.extend(agents.into_iter().map(Into::into));
        self
    }

    // ========== Getters ==========

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn aggregate_delta(&self) -> Option<f64> {
        self.aggregate_delta
    }

    pub fn next_steps(&self) -> &[NextStep] {
        &self.next_steps
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }
}

/// The ordered categories of one level
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    level: u32,
    categories: Vec<Category>,
}

impl RuleSet {
    /// Build a rule set. Later duplicates of a category name are dropped,
    /// names are unique per level.
    pub fn new(level: u32, categories: Vec<Category>) -> Self {
        let mut unique: Vec<Category> = Vec::with_capacity(categories.len());
        for category in categories {
            if !unique.iter().any(|c| c.name() == category.name()) {
                unique.push(category);
            }
        }
        Self {
            level,
            categories: unique,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn find(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// All rule sets, one per level
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    levels: BTreeMap<u32, RuleSet>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the rule set of a level
    pub fn insert(&mut self, rules: RuleSet) {
        self.levels.insert(rules.level(), rules);
    }

    pub fn for_level(&self, level: u32) -> Option<&RuleSet> {
        self.levels.get(&level)
    }

    pub fn levels(&self) -> Vec<u32> {
        self.levels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
