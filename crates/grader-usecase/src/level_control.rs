//! Level Controller - Advance and retry
//!
//! Both operations start a fresh attempt: follow-ups and the outcome
//! latch are re-armed, and the harm log is cleared.

use std::sync::Arc;

use grader_domain::{AgentRepository, Clock, ObjectiveRepository, RuleBook};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::session::{self, SharedSession};

/// What a level reset restored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub level: u32,
    pub agents_restored: usize,
    pub objectives_reopened: usize,
}

pub struct LevelController<A, O> {
    agents: A,
    objectives: O,
    rules: Arc<RuleBook>,
    clock: Arc<dyn Clock>,
}

impl<A, O> LevelController<A, O>
where
    A: AgentRepository + Send,
    O: ObjectiveRepository + Send,
{
    pub fn new(agents: A, objectives: O, rules: Arc<RuleBook>, clock: Arc<dyn Clock>) -> Self {
        Self {
            agents,
            objectives,
            rules,
            clock,
        }
    }

    /// Move the session to `level`. The level must have a rule set.
    pub fn advance_level(&mut self, session: &SharedSession, level: u32) -> Result<()> {
        if self.rules.for_level(level).is_none() {
            return Err(EngineError::MissingRuleSet {
                level,
                loaded: self.rules.levels(),
            });
        }

        let now = self.clock.now();
        let mut session = session::lock(session);
        let from = session.level();
        session.advance_level(level, now)?;
        info!(from, to = level, duration = session.clock().total_duration(), "Level advanced");
        Ok(())
    }

    /// Retry the current level from its starting state
    pub fn reset_level(&mut self, session: &SharedSession) -> Result<ResetReport> {
        let now = self.clock.now();
        let level = {
            let mut session = session::lock(session);
            session.retry(now);
            session.level()
        };

        let mut report = ResetReport {
            level,
            ..ResetReport::default()
        };

        for mut agent in self.agents.list_all()? {
            if agent.reset_traits() {
                self.agents.save(&agent)?;
                report.agents_restored += 1;
            }
        }

        for mut objective in self.objectives.find_by_level(level)? {
            if objective.is_completed() {
                objective.reopen();
                self.objectives.save(&objective)?;
                report.objectives_reopened += 1;
            }
        }

        info!(
            level,
            agents_restored = report.agents_restored,
            objectives_reopened = report.objectives_reopened,
            "Level reset"
        );
        Ok(report)
    }
}
