//! Agent - A simulated character in the social-media scenario
//!
//! Agent is an Entity (has identity).
//! The same AgentId refers to the same character even while its
//! attributes drift during a level.
//!
//! Attributes are only changed through `set_attribute`, which clamps,
//! so an Agent can never hold an out-of-domain value.

use super::attribute::{Attribute, Traits};

/// Unique identifier for an Agent (the store identifier)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What part an agent plays in the scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Bystander,
    Bully,
    Victim,
    Neutral,
}

impl AgentRole {
    /// Parse a role name; anything unknown is Neutral
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bystander" => AgentRole::Bystander,
            "bully" => AgentRole::Bully,
            "victim" => AgentRole::Victim,
            _ => AgentRole::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Bystander => "bystander",
            AgentRole::Bully => "bully",
            AgentRole::Victim => "victim",
            AgentRole::Neutral => "neutral",
        }
    }
}

impl core::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Agent - A character with a role and bounded attributes
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique identifier (Entity identity)
    id: AgentId,
    /// Username shown in the feed, also used in @mentions and chat ids
    username: String,
    role: AgentRole,
    /// Current attribute values
    traits: Traits,
    /// Snapshot restored on level reset
    initial_traits: Option<Traits>,
}

impl Agent {
    /// Create a new Agent with no attributes set
    pub fn new(id: AgentId, username: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            traits: Traits::new(),
            initial_traits: None,
        }
    }

    /// Builder: set current traits
    pub fn with_traits(mut self, traits: Traits) -> Self {
        self.traits = traits;
        self
    }

    /// Builder: set the reset snapshot
    pub fn with_initial_traits(mut self, traits: Traits) -> Self {
        self.initial_traits = Some(traits);
        self
    }

    // ========== Getters ==========

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn traits(&self) -> &Traits {
        &self.traits
    }

    pub fn initial_traits(&self) -> Option<&Traits> {
        self.initial_traits.as_ref()
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<f64> {
        self.traits.get(attribute)
    }

    // ========== Mutations ==========

    /// Write an attribute (clamped). Returns the stored value.
    pub fn set_attribute(&mut self, attribute: Attribute, value: f64) -> f64 {
        self.traits.set(attribute, value)
    }

    /// Restore traits from the initial snapshot.
    ///
    /// Returns false when the agent has no snapshot; its traits are
    /// left untouched in that case.
    pub fn reset_traits(&mut self) -> bool {
        match &self.initial_traits {
            Some(initial) => {
                self.traits = initial.clone();
                true
            }
            None => false,
        }
    }

    /// Whether `reference` names this agent (store id first, then username)
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        self.id.as_str() == reference || self.username == reference
    }
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        // Entity equality: same ID = same entity
        self.id == other.id
    }
}

impl Eq for Agent {}
