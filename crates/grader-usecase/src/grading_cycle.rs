//! Grading Cycle - One classification tick
//!
//! ```text
//! drain queue ─▶ classifier chain ─▶ DeltaApplier ─▶ ObjectiveTracker
//!                                          │                │
//!                                   attempt log      ObjectiveCompleted
//!                                          └──▶ follow-ups (first match per level)
//! ```
//!
//! Drained actions are gone: a failed cycle does not requeue them, and
//! a batch whose attempt ended mid-classification is dropped.
//! Store writes are sequential; a failure mid-cycle leaves earlier
//! writes in place.

use std::sync::Arc;

use grader_domain::{
    AgentRepository, CategoryMatch, Clock, DeltaApplier, DeltaEvent, ObjectiveEvent,
    ObjectiveRepository, ObjectiveTracker, RuleBook,
};
use tracing::{debug, info, warn};

use crate::classifier::ClassifierChain;
use crate::error::{EngineError, Result};
use crate::pending::PendingQueue;
use crate::port::{EngineEvent, EventPublisher, FollowUpEvent, ObjectiveCompletedEvent};
use crate::session::{self, SharedSession};

/// Summary of one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub level: u32,
    pub actions: usize,
    pub matches: Vec<CategoryMatch>,
    pub attributes_written: usize,
    pub objectives_completed: Vec<String>,
    pub follow_ups: usize,
    pub classifier_failures: usize,
    /// The level was advanced or retried while the batch was being
    /// classified; nothing was applied
    pub discarded: bool,
}

pub struct GradingCycle<A, O> {
    agents: A,
    objectives: O,
    rules: Arc<RuleBook>,
    chain: ClassifierChain,
    queue: Arc<PendingQueue>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    applier: DeltaApplier,
    tracker: ObjectiveTracker,
}

impl<A, O> GradingCycle<A, O>
where
    A: AgentRepository + Send,
    O: ObjectiveRepository + Send,
{
    pub fn new(
        agents: A,
        objectives: O,
        rules: Arc<RuleBook>,
        chain: ClassifierChain,
        queue: Arc<PendingQueue>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            agents,
            objectives,
            rules,
            chain,
            queue,
            clock,
            publisher,
            applier: DeltaApplier::new(),
            tracker: ObjectiveTracker::new(),
        }
    }

    pub async fn run(&mut self, session: &SharedSession) -> Result<CycleReport> {
        let actions = self.queue.drain();
        let (level, attempt) = {
            let session = session::lock(session);
            (session.level(), session.attempt_number())
        };
        let mut report = CycleReport {
            level,
            actions: actions.len(),
            ..CycleReport::default()
        };
        if actions.is_empty() {
            return Ok(report);
        }

        let rules = Arc::clone(&self.rules);
        let Some(rule_set) = rules.for_level(level) else {
            return Err(EngineError::MissingRuleSet {
                level,
                loaded: rules.levels(),
            });
        };

        let chain_outcome = self.chain.classify(&actions, rule_set).await;
        report.classifier_failures = chain_outcome.failures.len();
        let matches = chain_outcome.matches;
        for m in &matches {
            debug!(action_id = %m.action_id, category = %m.category, affected = ?m.affected_agents, "Action matched");
        }

        // Results land only in the attempt that was running when the
        // batch was drained. The session stays locked while they land,
        // so an advance or retry happens wholly before or after.
        let now = self.clock.now();
        let (delta_events, objective_events, follow_ups) = {
            let mut session = session::lock(session);
            if session.level() != level || session.attempt_number() != attempt {
                debug!(
                    level,
                    attempt,
                    current_level = session.level(),
                    current_attempt = session.attempt_number(),
                    "Attempt ended during classification, results dropped"
                );
                report.discarded = true;
                report.matches = matches;
                return Ok(report);
            }

            let applied = self.applier.apply(&mut self.agents, rule_set, &matches)?;
            let objective_events =
                self.tracker
                    .track(&mut self.objectives, level, &matches, &actions, now)?;

            let log = session.attempt_mut();
            log.record(applied.contributions);
            let mut follow_ups = Vec::new();
            for m in &matches {
                let Some(category) = rule_set.find(&m.category) else {
                    continue;
                };
                if category.next_steps().is_empty() || !log.mark_fired(category.name()) {
                    continue;
                }
                follow_ups.extend(
                    category
                        .next_steps()
                        .iter()
                        .map(|step| FollowUpEvent::new(level, category.name(), step)),
                );
            }
            (applied.events, objective_events, follow_ups)
        };

        for event in &delta_events {
            log_delta_event(event);
            if matches!(event, DeltaEvent::AttributeChanged { .. }) {
                report.attributes_written += 1;
            }
        }

        for event in objective_events {
            match event {
                ObjectiveEvent::Completed {
                    objective_id,
                    label,
                    category,
                    action_id,
                } => {
                    info!(level, objective = %objective_id, %label, %category, %action_id, "Objective completed");
                    self.publisher
                        .publish(EngineEvent::ObjectiveCompleted(ObjectiveCompletedEvent {
                            level,
                            objective_id: objective_id.clone(),
                            label,
                        }));
                    report.objectives_completed.push(objective_id);
                }
                ObjectiveEvent::UnknownAction { action_id } => {
                    debug!(%action_id, "Match for an action outside the batch");
                }
            }
        }

        report.follow_ups = follow_ups.len();
        for follow_up in follow_ups {
            debug!(category = %follow_up.category, kind = %follow_up.kind, agent = %follow_up.agent, "Publishing follow-up");
            self.publisher.publish(EngineEvent::FollowUp(follow_up));
        }

        info!(
            level,
            actions = report.actions,
            matches = matches.len(),
            attributes_written = report.attributes_written,
            objectives_completed = report.objectives_completed.len(),
            follow_ups = report.follow_ups,
            "Grading cycle finished"
        );
        report.matches = matches;
        Ok(report)
    }
}

fn log_delta_event(event: &DeltaEvent) {
    match event {
        DeltaEvent::AttributeChanged {
            username,
            attribute,
            previous,
            requested,
            stored,
            ..
        } => {
            debug!(agent = %username, %attribute, previous, requested, stored, "Attribute written");
        }
        DeltaEvent::UnknownCategory { action_id, category } => {
            debug!(%action_id, %category, "Unknown category, skipped");
        }
        DeltaEvent::UnresolvedAgent { category, reference } => {
            warn!(%category, %reference, "No agent matches reference, skipped");
        }
        DeltaEvent::AggregateDeltaIgnored { category, value } => {
            debug!(%category, value, "Aggregate delta has no target field, not applied");
        }
    }
}
