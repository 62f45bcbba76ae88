use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use trailhead_ir::ActionId;

use crate::plan::Plan;

/// How occurrences are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    /// Every step counts, so an action taken twice in one plan counts twice.
    #[default]
    PerStep,
    /// Each plan counts an action at most once.
    PerPlan,
}

/// Action Occurrence Table plus the actions no plan exercises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceReport {
    pub action_occurrences: BTreeMap<ActionId, usize>,
    pub actions_not_covered: BTreeSet<ActionId>,
}

impl OccurrenceReport {
    pub fn count(&self, action: &ActionId) -> usize {
        self.action_occurrences.get(action).copied().unwrap_or(0)
    }

    /// Actions exercised at least once.
    pub fn covered(&self) -> BTreeSet<ActionId> {
        self.action_occurrences
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(a, _)| a.clone())
            .collect()
    }
}

/// Counts how often plans exercise each action.
pub trait OccurrenceCounter {
    /// Every action in `discovered` gets an entry, zero if unexercised.
    /// Actions found only in plans are counted too.
    fn calculate(
        &self,
        plans: &[Plan],
        discovered: &BTreeSet<ActionId>,
        mode: CountingMode,
    ) -> OccurrenceReport;
}

/// Straight tally over plan paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOccurrenceCounter;

impl OccurrenceCounter for PlanOccurrenceCounter {
    fn calculate(
        &self,
        plans: &[Plan],
        discovered: &BTreeSet<ActionId>,
        mode: CountingMode,
    ) -> OccurrenceReport {
        let mut occurrences: BTreeMap<ActionId, usize> =
            discovered.iter().map(|a| (a.clone(), 0)).collect();
        for plan in plans {
            match mode {
                CountingMode::PerStep => {
                    for action in plan.path() {
                        *occurrences.entry(action.clone()).or_insert(0) += 1;
                    }
                }
                CountingMode::PerPlan => {
                    for action in plan.action_set() {
                        *occurrences.entry(action).or_insert(0) += 1;
                    }
                }
            }
        }
        let actions_not_covered = occurrences
            .iter()
            .filter(|(_, &n)| n == 0)
            .map(|(a, _)| a.clone())
            .collect();
        OccurrenceReport {
            action_occurrences: occurrences,
            actions_not_covered,
        }
    }
}
