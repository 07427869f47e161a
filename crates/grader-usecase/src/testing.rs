//! In-test stores, clock and publisher

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use grader_domain::{
    Action, Agent, AgentId, AgentRepository, AgentRole, Attribute, Category, CategoryMatch,
    Clock, LevelClock, LevelSchedule, NextStep, Objective, ObjectiveId, ObjectiveRepository,
    RepositoryError, RuleSet, SessionContext, SnapshotRecord, StatsRepository, Timestamp, Traits,
};

use crate::classifier::Classifier;
use crate::error::ClassifierError;
use crate::port::{EngineEvent, EventPublisher};
use crate::session::{self, SharedSession};

#[derive(Clone, Default)]
pub struct Agents(pub Arc<Mutex<Vec<Agent>>>);

impl Agents {
    pub fn with(agents: Vec<Agent>) -> Self {
        Self(Arc::new(Mutex::new(agents)))
    }

    pub fn get(&self, username: &str) -> Agent {
        self.find_by_username(username).unwrap().unwrap()
    }
}

impl AgentRepository for Agents {
    fn register(&mut self, agent: Agent) -> Result<(), RepositoryError> {
        self.0.lock().unwrap().push(agent);
        Ok(())
    }

    fn save(&mut self, agent: &Agent) -> Result<(), RepositoryError> {
        let mut agents = self.0.lock().unwrap();
        match agents.iter_mut().find(|a| a.id() == agent.id()) {
            Some(existing) => *existing = agent.clone(),
            None => agents.push(agent.clone()),
        }
        Ok(())
    }

    fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.0.lock().unwrap().iter().find(|a| a.id() == id).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Agent>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username() == username)
            .cloned())
    }

    fn find_by_role(&self, role: AgentRole) -> Result<Vec<Agent>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.role() == role)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Agent>, RepositoryError> {
        Ok(self.0.lock().unwrap().clone())
    }
}

#[derive(Clone, Default)]
pub struct Objectives(pub Arc<Mutex<BTreeMap<String, Objective>>>);

impl Objectives {
    pub fn with(objectives: Vec<Objective>) -> Self {
        let repo = Self::default();
        for objective in objectives {
            repo.0
                .lock()
                .unwrap()
                .insert(objective.id().as_str().to_string(), objective);
        }
        repo
    }

    pub fn get(&self, id: &str) -> Objective {
        self.0.lock().unwrap()[id].clone()
    }
}

impl ObjectiveRepository for Objectives {
    fn save(&mut self, objective: &Objective) -> Result<(), RepositoryError> {
        self.0
            .lock()
            .unwrap()
            .insert(objective.id().as_str().to_string(), objective.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &ObjectiveId) -> Result<Option<Objective>, RepositoryError> {
        Ok(self.0.lock().unwrap().get(id.as_str()).cloned())
    }

    fn find_by_level(&self, level: u32) -> Result<Vec<Objective>, RepositoryError> {
        let mut found: Vec<Objective> = self
            .0
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.level() == level)
            .cloned()
            .collect();
        found.sort_by_key(|o| o.order());
        Ok(found)
    }

    fn list_all(&self) -> Result<Vec<Objective>, RepositoryError> {
        Ok(self.0.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct Stats(pub Arc<Mutex<Vec<SnapshotRecord>>>);

impl StatsRepository for Stats {
    fn archive(&mut self, record: SnapshotRecord) -> Result<(), RepositoryError> {
        self.0.lock().unwrap().push(record);
        Ok(())
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.0.lock().unwrap().len())
    }

    fn recent(&self, limit: usize) -> Result<Vec<SnapshotRecord>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Clock that only moves when told to
#[derive(Default)]
pub struct StepClock(AtomicI64);

impl StepClock {
    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds * 1_000, Ordering::SeqCst);
    }
}

impl Clock for StepClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.0.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct Recorder(pub Mutex<Vec<EngineEvent>>);

impl Recorder {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventPublisher for Recorder {
    fn publish(&self, event: EngineEvent) {
        self.0.lock().unwrap().push(event);
    }
}

/// Classifier stage with a fixed answer
pub struct Scripted(pub Vec<CategoryMatch>);

#[async_trait]
impl Classifier for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify(
        &self,
        actions: &[Action],
        _rules: &RuleSet,
    ) -> Result<Vec<CategoryMatch>, ClassifierError> {
        Ok(self
            .0
            .iter()
            .filter(|m| actions.iter().any(|a| a.id == m.action_id))
            .cloned()
            .collect())
    }
}

pub fn session_at(level: u32, clock: &StepClock) -> SharedSession {
    let schedule = LevelSchedule::uniform(300);
    session::shared(SessionContext::new(
        LevelClock::new(level, schedule, clock.now()).unwrap(),
    ))
}

pub fn bully(username: &str, value: f64) -> Agent {
    let traits = Traits::new()
        .with(Attribute::At, value)
        .with(Attribute::Pbc, value)
        .with(Attribute::Emp, value)
        .with(Attribute::Tin, value);
    Agent::new(AgentId::new(format!("id-{}", username)), username, AgentRole::Bully)
        .with_traits(traits.clone())
        .with_initial_traits(traits)
}

pub fn bystander(username: &str, value: f64) -> Agent {
    let traits = Traits::new()
        .with(Attribute::Prs, value)
        .with(Attribute::Cnt, value)
        .with(Attribute::Anx, value)
        .with(Attribute::VisitFreq, value);
    Agent::new(
        AgentId::new(format!("id-{}", username)),
        username,
        AgentRole::Bystander,
    )
    .with_traits(traits.clone())
    .with_initial_traits(traits)
}

pub fn level_one_rules() -> RuleSet {
    RuleSet::new(
        1,
        vec![
            Category::new(1, "EncourageBully", "Cheers the bully on")
                .with_delta(Attribute::Pbc, 2.0)
                .with_delta(Attribute::Prs, -1.0),
            Category::new(1, "PublicVictimSupport", "Defends the victim publicly")
                .with_delta(Attribute::Pbc, -2.0)
                .with_next_step(NextStep {
                    kind: "comment".to_string(),
                    agent: "friend1".to_string(),
                    content: "Thanks for speaking up".to_string(),
                }),
        ],
    )
}
