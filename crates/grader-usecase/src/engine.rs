//! Grading Engine - The coordinator that owns the session
//!
//! ```text
//!  change feed ──ingest──▶ PendingQueue ──classification tick──▶ GradingCycle
//!                                                                    │
//!  subscribers ◀──publish── ScoreBroadcaster ◀──broadcast tick──  agent store
//! ```
//!
//! Each component sits behind its own async mutex. Classification
//! ticks never overlap: a tick that finds the previous cycle still
//! running is skipped. The broadcast tick only waits on its own lock,
//! so a slow classification call never delays a snapshot.

use std::sync::Arc;
use std::time::Duration;

use grader_domain::{
    AgentRepository, Clock, DecayPolicy, LevelClock, LevelSchedule, ObjectiveRepository,
    RuleBook, ScoreEngine, ScoreSnapshot, ScoreWeights, SessionContext, StatsRepository,
};
use shared::{ClassifierConfig, EngineConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::broadcast::ScoreBroadcaster;
use crate::classifier::{ClassifierChain, DisclosureHeuristic, ServiceClassifier};
use crate::error::{EngineError, Result};
use crate::grading_cycle::{CycleReport, GradingCycle};
use crate::level_control::{LevelController, ResetReport};
use crate::normalizer::{ActionNormalizer, ChangeRecord};
use crate::outcome::ThresholdPolicy;
use crate::pending::PendingQueue;
use crate::port::{ClassificationService, EventPublisher};
use crate::session::{self, SharedSession};

/// The three stores the engine works on
pub struct Stores<A, O, S> {
    pub agents: A,
    pub objectives: O,
    pub stats: S,
}

/// Service stage first (when a service is configured), heuristic second
pub fn default_chain(
    config: &ClassifierConfig,
    service: Option<Arc<dyn ClassificationService>>,
) -> Result<ClassifierChain> {
    let mut chain = ClassifierChain::new();
    if let Some(service) = service {
        chain = chain.with_stage(ServiceClassifier::new(
            service,
            Duration::from_secs(config.timeout_secs),
            config.text_limit,
            config.sensitive_category.clone(),
        ));
    }
    Ok(chain.with_stage(DisclosureHeuristic::new(
        config.sensitive_category.clone(),
        &config.disclosure_pattern,
    )?))
}

pub fn level_schedule(config: &EngineConfig) -> Result<LevelSchedule> {
    Ok(LevelSchedule::new(
        config
            .level_durations
            .iter()
            .map(|step| (step.from_level, step.seconds)),
    )?)
}

pub struct GradingEngine<A, O, S> {
    session: SharedSession,
    queue: Arc<PendingQueue>,
    normalizer: ActionNormalizer,
    cycle: Mutex<GradingCycle<A, O>>,
    broadcaster: Mutex<ScoreBroadcaster<A, S>>,
    levels: Mutex<LevelController<A, O>>,
    broadcast_period: Duration,
    classification_period: Duration,
}

impl<A, O, S> GradingEngine<A, O, S>
where
    A: AgentRepository + Clone + Send + 'static,
    O: ObjectiveRepository + Clone + Send + 'static,
    S: StatsRepository + Send + 'static,
{
    pub fn new(
        config: &EngineConfig,
        stores: Stores<A, O, S>,
        rules: RuleBook,
        chain: ClassifierChain,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        if rules.for_level(config.start_level).is_none() {
            return Err(EngineError::MissingRuleSet {
                level: config.start_level,
                loaded: rules.levels(),
            });
        }

        let level_clock = LevelClock::new(config.start_level, level_schedule(config)?, clock.now())?;
        let session = session::shared(SessionContext::new(level_clock));

        let usernames = stores
            .agents
            .list_all()?
            .into_iter()
            .map(|a| a.username().to_string());
        let normalizer = ActionNormalizer::new(usernames)?;

        let rules = Arc::new(rules);
        let queue = Arc::new(PendingQueue::new());
        let weights = ScoreWeights {
            bystander: config.weights.bystander,
            victim_support: config.weights.victim_support,
            bully: config.weights.bully,
        };
        let scores = ScoreEngine::new(weights, DecayPolicy::new(config.decay_rate_seconds));

        info!(
            level = config.start_level,
            levels = ?rules.levels(),
            stages = ?chain.stage_names(),
            "Grading engine ready"
        );

        let cycle = GradingCycle::new(
            stores.agents.clone(),
            stores.objectives.clone(),
            Arc::clone(&rules),
            chain,
            Arc::clone(&queue),
            Arc::clone(&clock),
            Arc::clone(&publisher),
        );
        let broadcaster = ScoreBroadcaster::new(
            stores.agents.clone(),
            stores.stats,
            scores,
            Arc::clone(&clock),
            publisher,
        )
        .with_policy(ThresholdPolicy::new(config.outcome.win_threshold))
        .with_feedback_limit(config.outcome.feedback_limit);
        let levels = LevelController::new(stores.agents, stores.objectives, rules, clock);

        Ok(Self {
            session,
            queue,
            normalizer,
            cycle: Mutex::new(cycle),
            broadcaster: Mutex::new(broadcaster),
            levels: Mutex::new(levels),
            broadcast_period: Duration::from_millis(config.broadcast_period_ms),
            classification_period: Duration::from_millis(config.classification_period_ms),
        })
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Normalize change records and queue the resulting actions
    pub fn ingest(&self, records: &[ChangeRecord]) -> usize {
        let actions = self.normalizer.normalize(records);
        let queued = actions.len();
        if queued > 0 {
            self.queue.extend(actions);
            debug!(queued, pending = self.queue.len(), "Actions queued");
        }
        queued
    }

    pub async fn broadcast_tick(&self) -> Result<ScoreSnapshot> {
        self.broadcaster.lock().await.tick(&self.session)
    }

    /// Run one grading cycle, or None when the previous one is still running
    pub async fn classification_tick(&self) -> Option<Result<CycleReport>> {
        let Ok(mut cycle) = self.cycle.try_lock() else {
            debug!("Previous grading cycle still running, skipping tick");
            return None;
        };
        Some(cycle.run(&self.session).await)
    }

    pub async fn advance_level(&self, level: u32) -> Result<()> {
        self.levels.lock().await.advance_level(&self.session, level)
    }

    pub async fn reset_level(&self) -> Result<ResetReport> {
        self.levels.lock().await.reset_level(&self.session)
    }

    /// Start both periodic ticks
    pub fn spawn_ticks(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let engine = Arc::clone(self);
        let broadcast = tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.broadcast_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(err) = engine.broadcast_tick().await {
                    warn!(error = %err, "Broadcast tick failed");
                }
            }
        });

        let engine = Arc::clone(self);
        let classification = tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.classification_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Some(Err(err)) = engine.classification_tick().await {
                    warn!(error = %err, "Grading cycle failed");
                }
            }
        });

        (broadcast, classification)
    }
}
