//! Agent Repository - Abstract persistence for Agents
//!
//! Agents are populated from the scenario and looked up by store id,
//! username or role. Only the delta applier and level reset write.

use crate::model::agent::{Agent, AgentId, AgentRole};

/// Errors that can occur during repository operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Entity not found
    NotFound { id: String },
    /// Failed to persist
    PersistenceError { message: String },
}

impl core::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RepositoryError::NotFound { id } => {
                write!(f, "Not found: {}", id)
            }
            RepositoryError::PersistenceError { message } => {
                write!(f, "Persistence error: {}", message)
            }
        }
    }
}

/// Agent Repository Trait
///
/// This is a PORT in hexagonal architecture.
/// Writes must be idempotent: saving the same agent twice leaves the
/// store as if it was saved once.
pub trait AgentRepository {
    /// Register an agent in the system
    fn register(&mut self, agent: Agent) -> Result<(), RepositoryError>;

    /// Write back an agent's attributes (create or update)
    fn save(&mut self, agent: &Agent) -> Result<(), RepositoryError>;

    /// Find an agent by store id
    fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError>;

    /// Find an agent by username
    fn find_by_username(&self, username: &str) -> Result<Option<Agent>, RepositoryError>;

    /// Find all agents with a role, in registration order
    fn find_by_role(&self, role: AgentRole) -> Result<Vec<Agent>, RepositoryError>;

    /// List all agents, in registration order
    fn list_all(&self) -> Result<Vec<Agent>, RepositoryError>;

    /// Resolve a reference: store id first, then username
    fn resolve(&self, reference: &str) -> Result<Option<Agent>, RepositoryError> {
        if let Some(agent) = self.find_by_id(&AgentId::new(reference))? {
            return Ok(Some(agent));
        }
        self.find_by_username(reference)
    }

    /// Count agents by role
    fn count_by_role(&self, role: AgentRole) -> Result<usize, RepositoryError> {
        Ok(self.find_by_role(role)?.len())
    }
}
