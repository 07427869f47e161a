//! Scenario file formats
//!
//! A scenario directory looks like:
//!
//! ```text
//! scenarios/
//!   level_order.json          [{ "level": 1, "folder": "level1-jessie" }, ...]
//!   level1-jessie/
//!     solutions.json          categories for the level
//!     population.json         agents and objectives (optional)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry of level_order.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOrderEntry {
    pub level: u32,
    pub folder: String,
}

/// One attribute delta of a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub field: String,
    pub value: f64,
}

/// Deltas come either as a list of field deltas or, in older files,
/// as a single aggregate number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeltaSpec {
    Fields(Vec<FieldDelta>),
    Aggregate(f64),
}

impl Default for DeltaSpec {
    fn default() -> Self {
        DeltaSpec::Fields(Vec::new())
    }
}

/// Scripted side effect that follows a category match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStepDefinition {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub agent: String,

    pub content: String,
}

/// A category (solution rule) as written in solutions.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Optional in files that declare the level once at the top
    #[serde(default)]
    pub level: Option<u32>,

    pub category: String,

    pub description: String,

    #[serde(default)]
    pub deltas: DeltaSpec,

    #[serde(default, alias = "nextSteps")]
    pub next_steps: Vec<NextStepDefinition>,

    /// Agents the category is about (used by rule-based classification)
    #[serde(default)]
    pub agents: Vec<String>,
}

/// solutions.json is either a bare list or a level-tagged object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolutionsFile {
    Tagged {
        level: u32,
        categories: Vec<CategoryDefinition>,
    },
    List(Vec<CategoryDefinition>),
}

impl SolutionsFile {
    /// Declared level, from the wrapper or from the first category
    pub fn declared_level(&self) -> Option<u32> {
        match self {
            SolutionsFile::Tagged { level, .. } => Some(*level),
            SolutionsFile::List(categories) => categories.iter().find_map(|c| c.level),
        }
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        match self {
            SolutionsFile::Tagged { categories, .. } => categories,
            SolutionsFile::List(categories) => categories,
        }
    }
}

/// A simulated agent in population.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    pub id: String,
    pub username: String,
    pub role: String,

    /// Attribute name -> value
    #[serde(default)]
    pub traits: BTreeMap<String, f64>,

    /// Snapshot restored on level reset; defaults to `traits`
    #[serde(default)]
    pub initial_traits: Option<BTreeMap<String, f64>>,
}

/// A level objective in population.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveDefinition {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub level: Option<u32>,

    pub goal_category: String,

    pub task_type: String,

    #[serde(default)]
    pub target_agent: Option<String>,

    #[serde(default)]
    pub target_agent_username: Option<String>,

    pub label: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub hint: Option<String>,

    #[serde(default)]
    pub is_required: bool,

    #[serde(default)]
    pub order: u32,
}

/// population.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationFile {
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,

    #[serde(default)]
    pub objectives: Vec<ObjectiveDefinition>,
}
