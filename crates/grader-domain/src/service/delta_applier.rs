//! Delta Applier - Turns classifier matches into attribute changes
//!
//! For one cycle:
//! 1. Look up each matched category in the level's rule set
//! 2. Resolve every affected agent (store id first, then username)
//! 3. Sum the raw deltas per (agent, attribute) in match order
//! 4. Clamp once, write each touched agent once
//!
//! Every raw contribution is kept, tagged with its action, so a failed
//! level can be explained later.

use std::collections::BTreeMap;

use crate::model::action::{CategoryMatch, Contribution};
use crate::model::agent::{Agent, AgentId};
use crate::model::attribute::Attribute;
use crate::model::category::RuleSet;
use crate::repository::agent_repository::{AgentRepository, RepositoryError};

/// Events emitted by the DeltaApplier
///
/// The applier does not log; the caller decides what to do with these.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaEvent {
    /// A stored attribute was written
    AttributeChanged {
        agent_id: String,
        username: String,
        attribute: Attribute,
        previous: f64,
        requested: f64,
        stored: f64,
    },
    /// Match named a category the rule set does not have
    UnknownCategory { action_id: String, category: String },
    /// Affected-agent reference matched neither an id nor a username
    UnresolvedAgent { category: String, reference: String },
    /// Legacy single-number delta with no target field
    AggregateDeltaIgnored { category: String, value: f64 },
}

/// Result of one application pass
#[derive(Debug, Clone, Default)]
pub struct DeltaOutcome {
    /// Agents as written back to the store
    pub updated: Vec<Agent>,
    pub contributions: Vec<Contribution>,
    pub events: Vec<DeltaEvent>,
}

/// Pending writes for one agent
struct Pending {
    agent: Agent,
    sums: BTreeMap<Attribute, f64>,
}

/// DeltaApplier - Stateless
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaApplier;

impl DeltaApplier {
    pub fn new() -> Self {
        Self
    }

    pub fn apply<R: AgentRepository + ?Sized>(
        &self,
        agents: &mut R,
        rules: &RuleSet,
        matches: &[CategoryMatch],
    ) -> Result<DeltaOutcome, RepositoryError> {
        let mut outcome = DeltaOutcome::default();
        let mut order: Vec<AgentId> = Vec::new();
        let mut pending: BTreeMap<AgentId, Pending> = BTreeMap::new();

        for matched in matches {
            let Some(category) = rules.find(&matched.category) else {
                outcome.events.push(DeltaEvent::UnknownCategory {
                    action_id: matched.action_id.as_str().to_string(),
                    category: matched.category.clone(),
                });
                continue;
            };

            if let Some(value) = category.aggregate_delta() {
                outcome.events.push(DeltaEvent::AggregateDeltaIgnored {
                    category: category.name().to_string(),
                    value,
                });
            }
            if category.deltas().is_empty() {
                continue;
            }

            let mut seen: Vec<AgentId> = Vec::new();
            for reference in &matched.affected_agents {
                let Some(agent) = agents.resolve(reference)? else {
                    outcome.events.push(DeltaEvent::UnresolvedAgent {
                        category: category.name().to_string(),
                        reference: reference.clone(),
                    });
                    continue;
                };
                let id = agent.id().clone();
                // The same agent listed twice in one match counts once
                if seen.contains(&id) {
                    continue;
                }
                seen.push(id.clone());

                let entry = pending.entry(id.clone()).or_insert_with(|| {
                    order.push(id.clone());
                    Pending {
                        agent,
                        sums: BTreeMap::new(),
                    }
                });
                for delta in category.deltas() {
                    *entry.sums.entry(delta.attribute).or_insert(0.0) += delta.value;
                    outcome.contributions.push(Contribution {
                        action_id: matched.action_id.clone(),
                        category: category.name().to_string(),
                        agent: id.clone(),
                        attribute: delta.attribute,
                        delta: delta.value,
                    });
                }
            }
        }

        for id in order {
            let Some(Pending { mut agent, sums }) = pending.remove(&id) else {
                continue;
            };
            for (attribute, sum) in sums {
                // Unset attributes count from zero, then clamp as usual
                let previous = agent.attribute(attribute).unwrap_or(0.0);
                let requested = previous + sum;
                let stored = agent.set_attribute(attribute, requested);
                outcome.events.push(DeltaEvent::AttributeChanged {
                    agent_id: agent.id().as_str().to_string(),
                    username: agent.username().to_string(),
                    attribute,
                    previous,
                    requested,
                    stored,
                });
            }
            agents.save(&agent)?;
            outcome.updated.push(agent);
        }

        Ok(outcome)
    }
}
