//! Run summaries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use trailhead_explore::SearchStats;
use trailhead_ir::ActionId;

/// How a planning run ended with respect to coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// Greedy search satisfied every counted action.
    Complete,
    /// Greedy search stalled; the remaining witness plans were kept.
    Stalled,
    /// Greedy search was disabled; reduced witness plans are final.
    WitnessOnly,
}

/// Counts describing one planning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub status: CoverageStatus,
    /// Plans found by the forward search, one per witnessed action.
    pub witness_plans: usize,
    /// Witness plans left after reduction.
    pub reduced_plans: usize,
    pub final_plans: usize,
    /// Total steps across final plans.
    pub total_steps: usize,
    pub discovered_actions: usize,
    pub actions_not_covered: BTreeSet<ActionId>,
    pub stats: SearchStats,
}

impl RunSummary {
    /// Fraction of exposed actions exercised by the final plans.
    pub fn coverage(&self) -> f64 {
        if self.discovered_actions == 0 {
            return 1.0;
        }
        let covered = self.discovered_actions - self.actions_not_covered.len();
        covered as f64 / self.discovered_actions as f64
    }
}
