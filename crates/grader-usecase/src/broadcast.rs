//! Score Broadcaster - One broadcast tick
//!
//! Reads the agent store and the session clock, computes a snapshot,
//! archives it, publishes it and asks the outcome policy whether the
//! attempt is over.

use std::sync::Arc;

use grader_domain::{
    AgentRepository, AgentRole, Clock, ImpactAnalyzer, ScoreEngine, ScoreSnapshot,
    SnapshotRecord, StatsRepository,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::outcome::{OutcomePolicy, ThresholdPolicy};
use crate::port::{
    EngineEvent, EventPublisher, HarmfulAction, LevelOutcomeEvent, Outcome, ScoreUpdate,
};
use crate::session::{self, SharedSession};

pub struct ScoreBroadcaster<A, S> {
    agents: A,
    stats: S,
    engine: ScoreEngine,
    policy: Box<dyn OutcomePolicy>,
    feedback_limit: usize,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
}

impl<A, S> ScoreBroadcaster<A, S>
where
    A: AgentRepository + Send,
    S: StatsRepository + Send,
{
    pub fn new(
        agents: A,
        stats: S,
        engine: ScoreEngine,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            agents,
            stats,
            engine,
            policy: Box::new(ThresholdPolicy::default()),
            feedback_limit: 3,
            clock,
            publisher,
        }
    }

    /// Builder: replace the outcome policy
    pub fn with_policy(mut self, policy: impl OutcomePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Builder: how many harmful actions a lose outcome carries
    pub fn with_feedback_limit(mut self, limit: usize) -> Self {
        self.feedback_limit = limit;
        self
    }

    pub fn tick(&mut self, session: &SharedSession) -> Result<ScoreSnapshot> {
        let agents = self.agents.list_all()?;
        let now = self.clock.now();
        let window = session::lock(session).take_scoring_window(now);
        if window.level_changed {
            debug!(level = window.reading.level, "First reading after a level change, no decay");
        }

        let victims = agents.iter().filter(|a| a.role() == AgentRole::Victim).count();
        if victims > 1 {
            debug!(victims, "More than one victim, scoring the first");
        }

        let snapshot = self.engine.compute(&agents, window);

        if let Err(err) = self.stats.archive(SnapshotRecord {
            recorded_at: now,
            snapshot: snapshot.clone(),
        }) {
            warn!(error = %err, "Failed to archive score snapshot");
        }

        self.publisher
            .publish(EngineEvent::ScoreUpdate(ScoreUpdate::from(&snapshot)));

        if let Some(outcome) = self.policy.decide(&snapshot) {
            self.emit_outcome(session, outcome, &snapshot);
        }

        Ok(snapshot)
    }

    fn emit_outcome(&self, session: &SharedSession, outcome: Outcome, snapshot: &ScoreSnapshot) {
        let feedback = {
            let mut session = session::lock(session);
            if session.level() != snapshot.level || !session.attempt_mut().mark_outcome_emitted() {
                return;
            }
            match outcome {
                Outcome::Win => Vec::new(),
                Outcome::Lose => ImpactAnalyzer::new()
                    .rank(session.attempt().contributions())
                    .iter()
                    .take(self.feedback_limit)
                    .map(HarmfulAction::from)
                    .collect(),
            }
        };

        info!(
            ?outcome,
            level = snapshot.level,
            health_score = snapshot.health_score,
            feedback = feedback.len(),
            "Level outcome"
        );
        self.publisher
            .publish(EngineEvent::LevelOutcome(LevelOutcomeEvent {
                outcome,
                level: snapshot.level,
                health_score: snapshot.health_score,
                feedback,
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use grader_domain::{ActionId, AgentId, Attribute, Contribution};

    struct Fixture {
        stats: Stats,
        publisher: Arc<Recorder>,
        clock: Arc<StepClock>,
        broadcaster: ScoreBroadcaster<Agents, Stats>,
    }

    fn fixture(policy: ThresholdPolicy) -> Fixture {
        let agents = Agents::with(vec![bully("bully1", 3.0), bystander("friend1", 7.0)]);
        let stats = Stats::default();
        let publisher = Arc::new(Recorder::default());
        let clock = Arc::new(StepClock::default());
        let broadcaster = ScoreBroadcaster::new(
            agents,
            stats.clone(),
            ScoreEngine::default(),
            clock.clone(),
            publisher.clone(),
        )
        .with_policy(policy)
        .with_feedback_limit(1);
        Fixture {
            stats,
            publisher,
            clock,
            broadcaster,
        }
    }

    fn outcomes(recorder: &Recorder) -> Vec<LevelOutcomeEvent> {
        recorder
            .events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::LevelOutcome(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tick_publishes_and_archives() {
        let mut f = fixture(ThresholdPolicy::default());
        let session = session_at(1, &f.clock);

        let snapshot = f.broadcaster.tick(&session).unwrap();

        assert_eq!(snapshot.level, 1);
        assert_eq!(snapshot.time_left, 300);
        assert_eq!(f.stats.count().unwrap(), 1);
        assert!(matches!(
            f.publisher.events().as_slice(),
            [EngineEvent::ScoreUpdate(update)] if update.health_score == snapshot.health_score
        ));
    }

    #[test]
    fn test_decay_is_monotone_within_a_level() {
        let mut f = fixture(ThresholdPolicy::default());
        let session = session_at(1, &f.clock);

        let first = f.broadcaster.tick(&session).unwrap();
        let mut previous = first.health_score;
        for _ in 0..10 {
            f.clock.advance(25);
            let snapshot = f.broadcaster.tick(&session).unwrap();
            assert!(snapshot.health_score <= previous);
            previous = snapshot.health_score;
        }
    }

    #[test]
    fn test_level_change_resets_decay() {
        let mut f = fixture(ThresholdPolicy::default());
        let session = session_at(1, &f.clock);
        f.broadcaster.tick(&session).unwrap();
        f.clock.advance(185);
        let stale = f.broadcaster.tick(&session).unwrap();
        assert_eq!(stale.decay, 18);

        session::lock(&session)
            .advance_level(2, f.clock.now())
            .unwrap();
        f.clock.advance(30);
        let fresh = f.broadcaster.tick(&session).unwrap();

        assert_eq!(fresh.level, 2);
        assert_eq!(fresh.decay, 0);
        assert_eq!(fresh.health_score, fresh.raw_health_score);
    }

    #[test]
    fn test_lose_emitted_once_with_feedback() {
        let mut f = fixture(ThresholdPolicy::default());
        let session = session_at(1, &f.clock);
        session::lock(&session).attempt_mut().record(vec![
            Contribution {
                action_id: ActionId::new("c1"),
                category: "EncourageBully".to_string(),
                agent: AgentId::new("id-bully1"),
                attribute: Attribute::Pbc,
                delta: 2.0,
            },
            Contribution {
                action_id: ActionId::new("c2"),
                category: "MockVictim".to_string(),
                agent: AgentId::new("id-bully1"),
                attribute: Attribute::At,
                delta: 1.0,
            },
        ]);

        f.clock.advance(300);
        f.broadcaster.tick(&session).unwrap();
        f.clock.advance(1);
        f.broadcaster.tick(&session).unwrap();

        let outcomes = outcomes(&f.publisher);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].outcome, Outcome::Lose);
        assert_eq!(outcomes[0].feedback.len(), 1);
        assert_eq!(outcomes[0].feedback[0].action_id, "c1");
    }

    #[test]
    fn test_win_rearmed_by_retry() {
        let mut f = fixture(ThresholdPolicy::new(Some(0)));
        let session = session_at(1, &f.clock);

        f.broadcaster.tick(&session).unwrap();
        f.broadcaster.tick(&session).unwrap();
        session::lock(&session).retry(f.clock.now());
        f.broadcaster.tick(&session).unwrap();

        let outcomes = outcomes(&f.publisher);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.outcome == Outcome::Win && o.feedback.is_empty()));
    }
}
