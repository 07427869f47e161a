//! Impact Analyzer - Ranks actions by how much harm they did
//!
//! Used to explain a lost level. Each raw contribution is weighted by
//! how strongly its attribute drives the scores, and signed so that
//! harm is positive. Only harmful contributions add to an action's
//! total; helpful ones never offset them. Victim-support measures carry
//! no weight.

use std::collections::BTreeMap;

use crate::model::action::{ActionId, Contribution};
use crate::model::attribute::Attribute;

/// (weight, sign) of an attribute in the harm sum
fn harm_factor(attribute: Attribute) -> Option<(f64, f64)> {
    match attribute {
        Attribute::Prs => Some((0.33, -1.0)),
        Attribute::Cnt => Some((0.23, -1.0)),
        Attribute::Anx => Some((0.16, 1.0)),
        Attribute::VisitFreq => Some((0.07, -1.0)),
        Attribute::At => Some((0.203, 1.0)),
        Attribute::Pbc => Some((0.44, 1.0)),
        Attribute::Emp => Some((0.101, 1.0)),
        Attribute::Tin => Some((0.144, 1.0)),
        Attribute::Ues | Attribute::Ura | Attribute::Uad | Attribute::Ups => None,
    }
}

/// One harmful action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionImpact {
    pub action_id: ActionId,
    /// Positive, rounded to 3 decimals
    pub harm: f64,
    /// Categories the action matched, in first-seen order
    pub categories: Vec<String>,
}

/// ImpactAnalyzer - Stateless
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactAnalyzer;

impl ImpactAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Harm of one contribution
    pub fn harm(&self, contribution: &Contribution) -> f64 {
        harm_factor(contribution.attribute)
            .map(|(weight, sign)| contribution.delta * weight * sign)
            .unwrap_or(0.0)
    }

    /// Harmful actions, most harmful first
    pub fn rank(&self, contributions: &[Contribution]) -> Vec<ActionImpact> {
        let mut order: Vec<ActionId> = Vec::new();
        let mut totals: BTreeMap<ActionId, (f64, Vec<String>)> = BTreeMap::new();

        for contribution in contributions {
            let entry = totals
                .entry(contribution.action_id.clone())
                .or_insert_with(|| {
                    order.push(contribution.action_id.clone());
                    (0.0, Vec::new())
                });
            let harm = self.harm(contribution);
            if harm > 0.0 {
                entry.0 += harm;
            }
            if !entry.1.contains(&contribution.category) {
                entry.1.push(contribution.category.clone());
            }
        }

        let mut ranked: Vec<ActionImpact> = order
            .into_iter()
            .filter_map(|id| {
                let (total, categories) = totals.remove(&id)?;
                let harm = (total * 1000.0).round() / 1000.0;
                (harm > 0.0).then_some(ActionImpact {
                    action_id: id,
                    harm,
                    categories,
                })
            })
            .collect();
        // Stable: ties keep first-seen order
        ranked.sort_by(|a, b| b.harm.total_cmp(&a.harm));
        ranked
    }
}
