//! In-Memory Repository Implementations
//!
//! Thread-safe stores behind `Arc<RwLock<..>>`. Clones share state, so
//! the grading cycle, the broadcaster and the level controller all see
//! the same agents.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use grader_domain::{
    Agent, AgentId, AgentRepository, AgentRole, Objective, ObjectiveId, ObjectiveRepository,
    RepositoryError, SnapshotRecord, StatsRepository,
};

fn read_error() -> RepositoryError {
    RepositoryError::PersistenceError {
        message: "Failed to acquire read lock".to_string(),
    }
}

fn write_error() -> RepositoryError {
    RepositoryError::PersistenceError {
        message: "Failed to acquire write lock".to_string(),
    }
}

#[derive(Debug, Default)]
struct AgentTable {
    /// Registration order; `list_all` follows it
    order: Vec<String>,
    by_id: HashMap<String, Agent>,
}

/// In-memory Agent Repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentRepository {
    agents: Arc<RwLock<AgentTable>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentRepository for InMemoryAgentRepository {
    fn register(&mut self, agent: Agent) -> Result<(), RepositoryError> {
        let mut agents = self.agents.write().map_err(|_| write_error())?;
        let id = agent.id().as_str().to_string();
        if agents.by_id.insert(id.clone(), agent).is_none() {
            agents.order.push(id);
        }
        Ok(())
    }

    fn save(&mut self, agent: &Agent) -> Result<(), RepositoryError> {
        self.register(agent.clone())
    }

    fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let agents = self.agents.read().map_err(|_| read_error())?;
        Ok(agents.by_id.get(id.as_str()).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Agent>, RepositoryError> {
        let agents = self.agents.read().map_err(|_| read_error())?;
        Ok(agents
            .order
            .iter()
            .filter_map(|id| agents.by_id.get(id))
            .find(|a| a.username() == username)
            .cloned())
    }

    fn find_by_role(&self, role: AgentRole) -> Result<Vec<Agent>, RepositoryError> {
        let agents = self.agents.read().map_err(|_| read_error())?;
        Ok(agents
            .order
            .iter()
            .filter_map(|id| agents.by_id.get(id))
            .filter(|a| a.role() == role)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Agent>, RepositoryError> {
        let agents = self.agents.read().map_err(|_| read_error())?;
        Ok(agents
            .order
            .iter()
            .filter_map(|id| agents.by_id.get(id))
            .cloned()
            .collect())
    }
}

/// In-memory Objective Repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectiveRepository {
    objectives: Arc<RwLock<HashMap<String, Objective>>>,
}

impl InMemoryObjectiveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectiveRepository for InMemoryObjectiveRepository {
    fn save(&mut self, objective: &Objective) -> Result<(), RepositoryError> {
        let mut objectives = self.objectives.write().map_err(|_| write_error())?;
        objectives.insert(objective.id().as_str().to_string(), objective.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &ObjectiveId) -> Result<Option<Objective>, RepositoryError> {
        let objectives = self.objectives.read().map_err(|_| read_error())?;
        Ok(objectives.get(id.as_str()).cloned())
    }

    fn find_by_level(&self, level: u32) -> Result<Vec<Objective>, RepositoryError> {
        let objectives = self.objectives.read().map_err(|_| read_error())?;
        let mut found: Vec<Objective> = objectives
            .values()
            .filter(|o| o.level() == level)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.order()
                .cmp(&b.order())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });
        Ok(found)
    }

    fn list_all(&self) -> Result<Vec<Objective>, RepositoryError> {
        let objectives = self.objectives.read().map_err(|_| read_error())?;
        let mut all: Vec<Objective> = objectives.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.level(), a.order(), a.id().as_str()).cmp(&(b.level(), b.order(), b.id().as_str()))
        });
        Ok(all)
    }
}

/// In-memory score archive, bounded to the most recent `capacity` records
#[derive(Debug, Clone)]
pub struct InMemoryStatsRepository {
    records: Arc<RwLock<VecDeque<SnapshotRecord>>>,
    capacity: usize,
}

impl InMemoryStatsRepository {
    pub const DEFAULT_CAPACITY: usize = 3_600;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryStatsRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRepository for InMemoryStatsRepository {
    fn archive(&mut self, record: SnapshotRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(|_| write_error())?;
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        let records = self.records.read().map_err(|_| read_error())?;
        Ok(records.len())
    }

    fn recent(&self, limit: usize) -> Result<Vec<SnapshotRecord>, RepositoryError> {
        let records = self.records.read().map_err(|_| read_error())?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
