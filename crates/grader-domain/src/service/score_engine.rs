//! Score Engine - Derives the wellbeing metrics from agent attributes
//!
//! Pure function of the agent population and a clock reading:
//! 1. Bystander: normalized intention to intervene, averaged
//! 2. Bully: normalized antisocial score (higher = less antisocial), averaged
//! 3. Victim support: weighted average of the victim's support measures
//! 4. Health: weighted composite on a 0-100 scale, minus time decay
//!
//! No I/O, no async, no external dependencies.

use std::collections::BTreeMap;

use crate::model::agent::{Agent, AgentRole};
use crate::model::attribute::{Attribute, AttributeDomain, Traits};
use crate::model::score::{DecayPolicy, ScoreSnapshot, ScoreWeights};
use crate::model::session::ScoringWindow;

/// Victim support measures and their weights
const VICTIM_SUPPORT_WEIGHTS: [(Attribute, f64); 4] = [
    (Attribute::Ues, 0.88),
    (Attribute::Ura, 0.92),
    (Attribute::Uad, 0.92),
    (Attribute::Ups, 0.87),
];

/// Raw intention to intervene
pub fn intention(prs: f64, cnt: f64, anx: f64, visit_freq: f64) -> f64 {
    let pls = 0.62 * prs;
    let pnv = 0.33 * pls + 0.18 * cnt - 0.16 * anx;
    0.48 * pnv + 0.18 * pls + 0.23 * cnt + 0.07 * visit_freq
}

/// Raw antisocial aggression score; larger is worse
pub fn antisocial_score(at: f64, pbc: f64, emp: f64, tin: f64) -> f64 {
    let bis = -0.203 * at - 0.44 * pbc - 0.101 * emp - 0.144 * tin;
    0.423 * bis - 0.138 * emp - 0.129 * (tin * bis)
}

fn bystander_inputs(traits: &Traits) -> (f64, f64, f64, f64) {
    let min = AttributeDomain::Bystander.min();
    (
        traits.get_or(Attribute::Prs, min),
        traits.get_or(Attribute::Cnt, min),
        traits.get_or(Attribute::Anx, min),
        traits.get_or(Attribute::VisitFreq, min),
    )
}

fn bully_inputs(traits: &Traits) -> (f64, f64, f64, f64) {
    let min = AttributeDomain::Bully.min();
    (
        traits.get_or(Attribute::At, min),
        traits.get_or(Attribute::Pbc, min),
        traits.get_or(Attribute::Emp, min),
        traits.get_or(Attribute::Tin, min),
    )
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// ScoreEngine - Stateless apart from its precomputed normalization bounds
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    weights: ScoreWeights,
    decay: DecayPolicy,
    intention_max: f64,
    antisocial_best: f64,
    antisocial_worst: f64,
}

impl ScoreEngine {
    pub fn new(weights: ScoreWeights, decay: DecayPolicy) -> Self {
        let top = AttributeDomain::Bystander.max();
        let intention_max = intention(top, top, top, top);

        // AAS is linear in AT, PBC, EMP and convex in TIN, so the
        // corners of the bully domain bound it.
        let (lo, hi) = (AttributeDomain::Bully.min(), AttributeDomain::Bully.max());
        let mut best = f64::INFINITY;
        let mut worst = f64::NEG_INFINITY;
        for corner in 0..16u8 {
            let pick = |bit: u8| if corner & (1 << bit) == 0 { lo } else { hi };
            let aas = antisocial_score(pick(0), pick(1), pick(2), pick(3));
            best = best.min(aas);
            worst = worst.max(aas);
        }

        Self {
            weights,
            decay,
            intention_max,
            antisocial_best: best,
            antisocial_worst: worst,
        }
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    pub fn decay(&self) -> DecayPolicy {
        self.decay
    }

    /// Intention at the domain ceiling
    pub fn intention_max(&self) -> f64 {
        self.intention_max
    }

    /// (best, worst) antisocial score over the bully domain
    pub fn antisocial_bounds(&self) -> (f64, f64) {
        (self.antisocial_best, self.antisocial_worst)
    }

    /// Normalized bystander intention, [0, 1]
    pub fn bystander_score(&self, traits: &Traits) -> f64 {
        let (prs, cnt, anx, visit_freq) = bystander_inputs(traits);
        if self.intention_max <= 0.0 {
            return 0.0;
        }
        (intention(prs, cnt, anx, visit_freq) / self.intention_max).clamp(0.0, 1.0)
    }

    /// Normalized bully score, [0, 1]; 1 = least antisocial
    pub fn bully_score(&self, traits: &Traits) -> f64 {
        let (at, pbc, emp, tin) = bully_inputs(traits);
        let span = self.antisocial_worst - self.antisocial_best;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.antisocial_worst - antisocial_score(at, pbc, emp, tin)) / span).clamp(0.0, 1.0)
    }

    /// Weighted average of the measures the victim actually has
    pub fn victim_support_score(&self, victim: &Agent, bystander_score: f64) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (attribute, weight) in VICTIM_SUPPORT_WEIGHTS {
            if let Some(value) = victim.attribute(attribute) {
                let value = if attribute == Attribute::Ues {
                    (value + bystander_score).min(1.0)
                } else {
                    value
                };
                weighted += weight * value;
                total_weight += weight;
            }
        }
        if total_weight == 0.0 {
            0.0
        } else {
            (weighted / total_weight).clamp(0.0, 1.0)
        }
    }

    /// Composite 0-100 score before decay
    pub fn raw_health(&self, bystander: f64, victim_support: f64, bully: f64) -> u32 {
        let w = &self.weights;
        let composite =
            100.0 * (w.bystander * bystander + w.victim_support * victim_support + w.bully * bully);
        composite.round().clamp(0.0, 100.0) as u32
    }

    /// Compute a full snapshot.
    ///
    /// The first reading after a level change carries no decay.
    pub fn compute(&self, agents: &[Agent], window: ScoringWindow) -> ScoreSnapshot {
        let bystander_scores: BTreeMap<String, f64> = agents
            .iter()
            .filter(|a| a.role() == AgentRole::Bystander)
            .map(|a| (a.username().to_string(), self.bystander_score(a.traits())))
            .collect();
        let bully_scores: BTreeMap<String, f64> = agents
            .iter()
            .filter(|a| a.role() == AgentRole::Bully)
            .map(|a| (a.username().to_string(), self.bully_score(a.traits())))
            .collect();

        let bystander_score = mean(bystander_scores.values().copied());
        let bully_score = mean(bully_scores.values().copied());
        let victim_support_score = agents
            .iter()
            .find(|a| a.role() == AgentRole::Victim)
            .map(|victim| self.victim_support_score(victim, bystander_score))
            .unwrap_or(0.0);

        let raw_health_score = self.raw_health(bystander_score, victim_support_score, bully_score);
        let decay = if window.level_changed {
            0
        } else {
            self.decay.penalty(window.reading.elapsed)
        };
        let health_score = (raw_health_score as u64).saturating_sub(decay).min(100) as u32;

        ScoreSnapshot {
            bystander_score,
            bully_score,
            victim_support_score,
            health_score,
            raw_health_score,
            decay,
            time_left: window.reading.time_left,
            level: window.reading.level,
            bystander_scores,
            bully_scores,
        }
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(ScoreWeights::default(), DecayPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::agent::AgentId;
    use crate::model::session::LevelReading;

    fn window(elapsed: u64, level_changed: bool) -> ScoringWindow {
        ScoringWindow {
            reading: LevelReading {
                level: 1,
                total_duration: 300,
                time_left: 300 - elapsed,
                elapsed,
            },
            level_changed,
        }
    }

    fn bystander(name: &str, value: f64) -> Agent {
        Agent::new(AgentId::new(name), name, AgentRole::Bystander).with_traits(
            Traits::new()
                .with(Attribute::Prs, value)
                .with(Attribute::Cnt, value)
                .with(Attribute::Anx, value)
                .with(Attribute::VisitFreq, value),
        )
    }

    fn bully(name: &str, at: f64, pbc: f64, emp: f64, tin: f64) -> Agent {
        Agent::new(AgentId::new(name), name, AgentRole::Bully).with_traits(
            Traits::new()
                .with(Attribute::At, at)
                .with(Attribute::Pbc, pbc)
                .with(Attribute::Emp, emp)
                .with(Attribute::Tin, tin),
        )
    }

    fn victim(ues: f64, ura: f64, uad: f64, ups: f64) -> Agent {
        Agent::new(AgentId::new("victim1"), "victim1", AgentRole::Victim).with_traits(
            Traits::new()
                .with(Attribute::Ues, ues)
                .with(Attribute::Ura, ura)
                .with(Attribute::Uad, uad)
                .with(Attribute::Ups, ups),
        )
    }

    #[test]
    fn test_normalization_bounds() {
        let engine = ScoreEngine::default();
        assert!((engine.intention_max() - 3.635856).abs() < 1e-9);

        let (best, worst) = engine.antisocial_bounds();
        assert!((best - antisocial_score(5.0, 5.0, 5.0, 1.0)).abs() < 1e-12);
        assert!((worst - antisocial_score(5.0, 5.0, 1.0, 5.0)).abs() < 1e-12);
        assert!((best + 1.826).abs() < 1e-3);
        assert!((worst - 0.758).abs() < 1e-3);
    }

    #[test]
    fn test_bystander_at_ceiling_is_one() {
        let engine = ScoreEngine::default();
        assert!((engine.bystander_score(bystander("b", 7.0).traits()) - 1.0).abs() < 1e-12);
        assert_eq!(engine.bystander_score(&Traits::new()), 0.0);
    }

    #[test]
    fn test_bully_extremes() {
        let engine = ScoreEngine::default();
        let best = bully("good", 5.0, 5.0, 5.0, 1.0);
        let worst = bully("bad", 5.0, 5.0, 1.0, 5.0);

        assert!((engine.bully_score(best.traits()) - 1.0).abs() < 1e-12);
        assert!(engine.bully_score(worst.traits()).abs() < 1e-12);
    }

    #[test]
    fn test_bully_score_follows_pbc_change() {
        let engine = ScoreEngine::default();
        let mut agent = bully("bully1", 3.0, 3.0, 3.0, 3.0);
        let before = engine.bully_score(agent.traits());

        let stored = agent.set_attribute(Attribute::Pbc, 3.0 - 2.0);
        assert_eq!(stored, 1.0);

        let after = engine.bully_score(agent.traits());
        let (best, worst) = engine.antisocial_bounds();
        let expected = (worst - antisocial_score(3.0, 1.0, 3.0, 3.0)) / (worst - best);
        assert!((after - expected).abs() < 1e-12);
        assert!((after - before).abs() > 1e-6);
    }

    #[test]
    fn test_victim_support_uses_present_measures_only() {
        let engine = ScoreEngine::default();
        let partial = Agent::new(AgentId::new("v"), "v", AgentRole::Victim)
            .with_traits(Traits::new().with(Attribute::Ura, 0.5));
        assert!((engine.victim_support_score(&partial, 0.9) - 0.5).abs() < 1e-12);

        let empty = Agent::new(AgentId::new("v"), "v", AgentRole::Victim);
        assert_eq!(engine.victim_support_score(&empty, 0.9), 0.0);
    }

    #[test]
    fn test_victim_support_ues_boost_is_capped() {
        let engine = ScoreEngine::default();
        let v = victim(0.8, 1.0, 1.0, 1.0);
        assert!((engine.victim_support_score(&v, 0.5) - 1.0).abs() < 1e-12);

        let v = victim(0.2, 0.0, 0.0, 0.0);
        let expected = 0.88 * 0.5 / (0.88 + 0.92 + 0.92 + 0.87);
        assert!((engine.victim_support_score(&v, 0.3) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_decay_example() {
        let engine = ScoreEngine::default();
        let agents = vec![bystander("b1", 5.0), bully("x", 3.0, 3.0, 3.0, 3.0), victim(0.5, 0.5, 0.5, 0.5)];

        let fresh = engine.compute(&agents, window(0, false));
        let later = engine.compute(&agents, window(185, false));

        assert_eq!(later.decay, 18);
        assert_eq!(later.raw_health_score, fresh.raw_health_score);
        assert_eq!(
            later.health_score,
            fresh.raw_health_score.saturating_sub(18)
        );
        assert_eq!(later.time_left, 115);
    }

    #[test]
    fn test_decay_is_monotone_and_floored() {
        let engine = ScoreEngine::default();
        let agents = vec![bystander("b1", 2.0), victim(0.1, 0.1, 0.1, 0.1)];

        let mut previous = u32::MAX;
        for elapsed in (0..=300).step_by(7) {
            let snapshot = engine.compute(&agents, window(elapsed, false));
            assert!(snapshot.health_score <= previous);
            assert!(snapshot.health_score <= 100);
            previous = snapshot.health_score;
        }
        assert_eq!(engine.compute(&agents, window(300, false)).health_score, 0);
    }

    #[test]
    fn test_level_change_drops_stale_decay() {
        let engine = ScoreEngine::default();
        let agents = vec![bystander("b1", 6.0), victim(0.9, 0.9, 0.9, 0.9)];

        let stale = engine.compute(&agents, window(250, false));
        let fresh = engine.compute(&agents, window(250, true));

        assert_eq!(fresh.decay, 0);
        assert_eq!(fresh.health_score, fresh.raw_health_score);
        assert_ne!(fresh.health_score, stale.health_score);
    }

    #[test]
    fn test_scores_bounded_over_population() {
        let engine = ScoreEngine::default();
        for step in 0..=10 {
            let x = step as f64;
            let agents = vec![
                bystander("b1", x * 0.7),
                bystander("b2", 7.0 - x * 0.7),
                bully("u1", 1.0 + x * 0.4, 5.0 - x * 0.4, 1.0 + x * 0.4, 5.0 - x * 0.4),
                victim(x / 10.0, 1.0 - x / 10.0, x / 10.0, 0.5),
            ];
            let snapshot = engine.compute(&agents, window(0, false));
            for score in [
                snapshot.bystander_score,
                snapshot.bully_score,
                snapshot.victim_support_score,
            ] {
                assert!((0.0..=1.0).contains(&score));
            }
            assert!(snapshot.health_score <= 100);
        }
    }

    #[test]
    fn test_empty_population() {
        let engine = ScoreEngine::default();
        let snapshot = engine.compute(&[], window(0, false));

        assert_eq!(snapshot.bystander_score, 0.0);
        assert_eq!(snapshot.bully_score, 0.0);
        assert_eq!(snapshot.victim_support_score, 0.0);
        assert_eq!(snapshot.health_score, 0);
        assert!(snapshot.bystander_scores.is_empty());
    }

    #[test]
    fn test_per_agent_breakdown_keyed_by_username() {
        let engine = ScoreEngine::default();
        let agents = vec![bystander("kim", 7.0), bully("bully1", 5.0, 5.0, 5.0, 1.0)];
        let snapshot = engine.compute(&agents, window(0, false));

        assert!((snapshot.bystander_scores["kim"] - 1.0).abs() < 1e-12);
        assert!((snapshot.bully_scores["bully1"] - 1.0).abs() < 1e-12);
    }
}
