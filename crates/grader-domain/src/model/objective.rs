//! Objective - A level goal the player completes through actions
//!
//! Objective is an Entity. Completion is monotonic: once completed,
//! an objective stays completed until the level is explicitly reset.

use super::action::CategoryMatch;
use super::agent::AgentId;
use super::session::Timestamp;

/// Unique identifier for an Objective
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectiveId(String);

impl ObjectiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of action an objective asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// A chat message
    Dm,
    /// A public comment
    Comment,
}

impl TaskType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dm" => Some(TaskType::Dm),
            "comment" => Some(TaskType::Comment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Dm => "dm",
            TaskType::Comment => "comment",
        }
    }
}

/// A level-scoped completion goal
#[derive(Debug, Clone)]
pub struct Objective {
    id: ObjectiveId,
    level: u32,
    goal_category: String,
    task_type: TaskType,
    target_agent: Option<AgentId>,
    target_agent_username: Option<String>,
    label: String,
    description: Option<String>,
    hint: Option<String>,
    is_required: bool,
    order: u32,
    completed: bool,
    completed_at: Option<Timestamp>,
}

impl Objective {
    /// Create a new open Objective
    pub fn new(
        id: ObjectiveId,
        level: u32,
        goal_category: impl Into<String>,
        task_type: TaskType,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            level,
            goal_category: goal_category.into(),
            task_type,
            target_agent: None,
            target_agent_username: None,
            label: label.into(),
            description: None,
            hint: None,
            is_required: false,
            order: 0,
            completed: false,
            completed_at: None,
        }
    }

    /// Builder: set the target agent
    pub fn with_target(mut self, id: Option<AgentId>, username: Option<String>) -> Self {
        self.target_agent = id;
        self.target_agent_username = username;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    // ========== Getters ==========

    pub fn id(&self) -> &ObjectiveId {
        &self.id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn goal_category(&self) -> &str {
        &self.goal_category
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn target_agent(&self) -> Option<&AgentId> {
        self.target_agent.as_ref()
    }

    pub fn target_agent_username(&self) -> Option<&str> {
        self.target_agent_username.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    // ========== Matching ==========

    /// Whether a classifier match (and the originating action's resolved
    /// target) satisfies this objective's target.
    ///
    /// Category and task type are filtered by the store query, not here.
    pub fn is_satisfied_by(&self, matched: &CategoryMatch, action_target: Option<&str>) -> bool {
        let username = self.target_agent_username.as_deref();

        let by_affected = matched.affected_agents.iter().any(|entry| {
            if entry.is_empty() {
                return false;
            }
            if let Some(id) = &self.target_agent {
                if entry == id.as_str() {
                    return true;
                }
            }
            match username {
                Some(name) if !name.is_empty() => {
                    entry == name || entry.to_lowercase().contains(&name.to_lowercase())
                }
                _ => false,
            }
        });

        let by_target = matches!(
            (action_target, username),
            (Some(target), Some(name)) if !name.is_empty() && target == name
        );

        by_affected || by_target
    }

    // ========== State Transitions ==========

    /// Mark completed. Returns false (and changes nothing) when the
    /// objective was already completed.
    pub fn complete(&mut self, at: Timestamp) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(at);
        true
    }

    /// Back to open; only used by an explicit level reset
    pub fn reopen(&mut self) {
        self.completed = false;
        self.completed_at = None;
    }
}

impl PartialEq for Objective {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Objective {}
