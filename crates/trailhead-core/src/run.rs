use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;
use trailhead_explore::coverage::{
    greedy_search, reduce, GreedyInput, OccurrenceCounter, OccurrenceReport, PlanOccurrenceCounter,
};
use trailhead_explore::plan::plans_to_json;
use trailhead_explore::rng;
use trailhead_explore::search::forward_search;
use trailhead_explore::{Plan, PlannerError, SearchContext};
use trailhead_ir::ActionId;
use trailhead_model::ComponentCatalog;

use crate::config::PlannerConfig;
use crate::summary::{CoverageStatus, RunSummary};

/// Stage id the greedy search derives its generator from.
const GREEDY_STAGE: u64 = 1;

/// Final plans of a run plus what they cover.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    pub plans: Vec<Plan>,
    /// Occurrence table over the final plans, including every exposed action.
    pub occurrences: OccurrenceReport,
    pub summary: RunSummary,
}

impl PlanningOutcome {
    pub fn actions_not_covered(&self) -> &BTreeSet<ActionId> {
        &self.occurrences.actions_not_covered
    }

    /// Final plans as a JSON array of test cases.
    pub fn plans_json(&self) -> Result<String, serde_json::Error> {
        plans_to_json(&self.plans)
    }
}

/// Plan the whole catalog: forward search for witnesses, reduce them, count
/// occurrences, then stitch coverage plans with the greedy search.
pub fn run_planner(
    catalog: Arc<ComponentCatalog>,
    config: &PlannerConfig,
) -> Result<PlanningOutcome, PlannerError> {
    let rng = rng::seeded(config.rng, config.seed, GREEDY_STAGE);
    let mut ctx = SearchContext::new(catalog, rng)?;
    info!(
        entry_points = ctx.entry_points().len(),
        seed = config.seed,
        "planning run started"
    );

    let forward = forward_search(&mut ctx, &config.forward, None)?;
    if forward.discovered.is_empty() {
        let entry = ctx
            .entry_points()
            .first()
            .map(|e| e.name.clone())
            .unwrap_or_default();
        return Err(PlannerError::NoStartingActions { entry });
    }
    info!(
        witnesses = forward.plans.len(),
        discovered = forward.discovered.len(),
        exposed = forward.all_actions.len(),
        expansions = forward.expansions,
        "forward search finished"
    );

    let reduced = reduce(&forward.plans);
    let counter = PlanOccurrenceCounter;

    let (plans, status) = if config.greedy.enabled {
        let input = GreedyInput {
            existing: &reduced,
            discovered: &forward.all_actions,
            counter: &counter,
            mode: config.counting,
        };
        let result = greedy_search(&mut ctx, &config.greedy, &input)?;
        let status = if result.complete {
            CoverageStatus::Complete
        } else {
            CoverageStatus::Stalled
        };
        (result.into_plans(), status)
    } else {
        (reduced.clone(), CoverageStatus::WitnessOnly)
    };

    let occurrences = counter.calculate(&plans, &forward.all_actions, config.counting);
    let summary = RunSummary {
        status,
        witness_plans: forward.plans.len(),
        reduced_plans: reduced.len(),
        final_plans: plans.len(),
        total_steps: plans.iter().map(Plan::len).sum(),
        discovered_actions: forward.all_actions.len(),
        actions_not_covered: occurrences.actions_not_covered.clone(),
        stats: ctx.stats.clone(),
    };
    info!(
        plans = summary.final_plans,
        steps = summary.total_steps,
        not_covered = summary.actions_not_covered.len(),
        status = ?summary.status,
        "planning run finished"
    );

    Ok(PlanningOutcome {
        plans,
        occurrences,
        summary,
    })
}

/// Shortest-first witness plan ending in `target`.
pub fn plan_for_action(
    catalog: Arc<ComponentCatalog>,
    config: &PlannerConfig,
    target: &ActionId,
) -> Result<Plan, PlannerError> {
    let rng = rng::seeded(config.rng, config.seed, GREEDY_STAGE);
    let mut ctx = SearchContext::new(catalog, rng)?;
    let forward = forward_search(&mut ctx, &config.forward, Some(target))?;
    forward
        .plans
        .into_iter()
        .find(|plan| plan.path().last() == Some(target))
        .ok_or_else(|| PlannerError::GoalNotFound {
            missing: vec![target.clone()],
        })
}
