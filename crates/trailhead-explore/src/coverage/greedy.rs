//! Greedy coverage construction.
//!
//! Builds plans one action at a time from an entry point, preferring
//! actions that still need covering. A plan that starts repeating itself is
//! rolled back to the nearest earlier step that still has an untried
//! alternative.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trailhead_ir::ActionId;

use crate::context::SearchContext;
use crate::coverage::occurrence::{CountingMode, OccurrenceCounter, OccurrenceReport};
use crate::error::PlannerError;
use crate::plan::Plan;
use crate::rng::{self, ChoiceRng};
use crate::search::apply;
use crate::search::node::SearchNode;

/// Greedy search limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    /// Run the greedy phase at all. When off, reduced witness plans are final.
    pub enabled: bool,
    /// Longest plan the greedy search will build.
    pub max_plan_length: usize,
    /// Consecutive attempts that satisfy nothing before giving up.
    pub max_stalled_attempts: usize,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_plan_length: 50,
            max_stalled_attempts: 64,
        }
    }
}

pub struct GreedyInput<'a> {
    /// Reduced witness plans.
    pub existing: &'a [Plan],
    /// Every action the occurrence table is built over.
    pub discovered: &'a BTreeSet<ActionId>,
    pub counter: &'a dyn OccurrenceCounter,
    pub mode: CountingMode,
}

#[derive(Debug, Clone, Default)]
pub struct GreedyResult {
    /// Plans built by this search, in construction order.
    pub plans: Vec<Plan>,
    /// Existing plans still contributing actions the new plans do not cover.
    pub kept_existing: Vec<Plan>,
    pub satisfied: BTreeSet<ActionId>,
    /// Whether every required action ended up satisfied.
    pub complete: bool,
}

impl GreedyResult {
    /// New plans followed by the existing plans still worth running.
    pub fn into_plans(self) -> Vec<Plan> {
        let mut plans = self.plans;
        plans.extend(self.kept_existing);
        plans
    }
}

// ── Coverage bookkeeping ──

struct Coverage<'a> {
    input: &'a GreedyInput<'a>,
    existing_sets: Vec<BTreeSet<ActionId>>,
    /// Actions with a nonzero count in the initial occurrence table.
    required: BTreeSet<ActionId>,
    satisfied: BTreeSet<ActionId>,
    /// Indices of existing plans not yet made redundant by `satisfied`.
    kept: Vec<usize>,
    occurrences: OccurrenceReport,
}

impl<'a> Coverage<'a> {
    fn new(input: &'a GreedyInput<'a>) -> Self {
        let occurrences = input
            .counter
            .calculate(input.existing, input.discovered, input.mode);
        let required = occurrences.covered();
        Self {
            input,
            existing_sets: input.existing.iter().map(Plan::action_set).collect(),
            required,
            satisfied: BTreeSet::new(),
            kept: (0..input.existing.len()).collect(),
            occurrences,
        }
    }

    fn is_complete(&self) -> bool {
        self.required.is_subset(&self.satisfied)
    }

    fn count(&self, action: &ActionId) -> usize {
        self.occurrences.count(action)
    }

    fn is_satisfied(&self, action: &ActionId) -> bool {
        self.satisfied.contains(action)
    }

    /// Mark `action` satisfied. True if it was required and not yet satisfied.
    fn satisfy(&mut self, action: &ActionId) -> bool {
        if !self.required.contains(action) || !self.satisfied.insert(action.clone()) {
            return false;
        }
        self.prune();
        true
    }

    fn unsatisfy(&mut self, actions: &[ActionId]) {
        if actions.is_empty() {
            return;
        }
        for action in actions {
            self.satisfied.remove(action);
        }
        self.prune();
    }

    /// Existing plans whose actions are all satisfied add nothing; drop them
    /// and recount. Depends only on `satisfied`, so rollback is exact.
    fn prune(&mut self) {
        let kept: Vec<usize> = (0..self.existing_sets.len())
            .filter(|&i| !self.existing_sets[i].is_subset(&self.satisfied))
            .collect();
        if kept == self.kept {
            return;
        }
        self.kept = kept;
        let plans = self.kept_plans();
        self.occurrences = self
            .input
            .counter
            .calculate(&plans, self.input.discovered, self.input.mode);
    }

    fn kept_plans(&self) -> Vec<Plan> {
        self.kept
            .iter()
            .map(|&i| self.input.existing[i].clone())
            .collect()
    }
}

// ── Search ──

/// Build plans until every action with a nonzero occurrence count is
/// covered, or `max_stalled_attempts` consecutive attempts add nothing.
pub fn greedy_search(
    ctx: &mut SearchContext,
    config: &GreedyConfig,
    input: &GreedyInput<'_>,
) -> Result<GreedyResult, PlannerError> {
    let mut coverage = Coverage::new(input);
    let mut plans: Vec<Plan> = Vec::new();
    let mut completed: HashSet<u64> = HashSet::new();
    let mut stalled = 0usize;
    let mut attempt = 0usize;

    info!(
        required = coverage.required.len(),
        existing = input.existing.len(),
        "greedy coverage search"
    );

    while !coverage.is_complete() {
        if stalled >= config.max_stalled_attempts {
            warn!(
                attempts = stalled,
                unsatisfied = coverage.required.difference(&coverage.satisfied).count(),
                "greedy search stalled; keeping existing plans for the remainder"
            );
            break;
        }
        let entry = pick_entry(ctx, &coverage, attempt)?;
        attempt += 1;

        let (node, newly) = build_plan(ctx, config, &mut coverage, &completed, entry)?;
        if newly.is_empty() {
            stalled += 1;
            ctx.stats.discarded_attempts += 1;
            debug!(length = node.path.len(), "plan satisfied nothing new; retrying");
            continue;
        }
        stalled = 0;

        let plan = node.to_plan();
        if !completed.insert(plan.path_hash()) {
            return Err(PlannerError::DuplicatePlanGenerated {
                path: plan.path().to_vec(),
            });
        }
        info!(
            length = plan.len(),
            newly_satisfied = newly.len(),
            satisfied = coverage.satisfied.len(),
            required = coverage.required.len(),
            "greedy plan accepted"
        );
        plans.push(plan);
    }

    Ok(GreedyResult {
        plans,
        kept_existing: coverage.kept_plans(),
        complete: coverage.is_complete(),
        satisfied: coverage.satisfied,
    })
}

/// Prefer an entry point whose root exposes unsatisfied actions, otherwise
/// rotate through entry points by attempt number.
fn pick_entry(
    ctx: &SearchContext,
    coverage: &Coverage<'_>,
    attempt: usize,
) -> Result<usize, PlannerError> {
    let count = ctx.entry_points().len();
    for offset in 0..count {
        let index = (attempt + offset) % count;
        let root = ctx.entry_node(index)?;
        if root
            .actions
            .iter()
            .any(|a| coverage.count(a) > 0 && !coverage.is_satisfied(a))
        {
            return Ok(index);
        }
    }
    Ok(attempt % count)
}

/// Satisfied actions recorded with the path index they were taken at.
type Newly = Vec<(usize, ActionId)>;

fn build_plan(
    ctx: &mut SearchContext,
    config: &GreedyConfig,
    coverage: &mut Coverage<'_>,
    completed: &HashSet<u64>,
    entry: usize,
) -> Result<(SearchNode, Newly), PlannerError> {
    let mut node = ctx.entry_node(entry)?;
    let mut snapshots: Vec<SearchNode> = vec![node.clone()];
    let mut newly: Newly = Vec::new();

    while node.path.len() < config.max_plan_length && !coverage.is_complete() {
        if let Some(last) = node.last_action.clone() {
            node.actions.remove(&last);
        }
        if node.actions.is_empty() {
            if node.path.is_empty() {
                return Err(PlannerError::NoStartingActions {
                    entry: node.entry_name().to_string(),
                });
            }
            break;
        }
        let Some(next) = choose_next(ctx.rng(), &node, coverage) else {
            break;
        };

        apply::take_action(&mut node, &next)?;
        ctx.stats.effects_applied += 1;

        let looped = ends_in_repeat(&node.path);
        if looped || completed.contains(&node.path_hash()) {
            if looped {
                ctx.stats.loops_detected += 1;
            }
            debug!(action = %next, depth = node.path.len(), looped, "backtracking");
            node = backtrack(&mut snapshots, &node.path, &mut newly, coverage)?;
            ctx.stats.backtracks += 1;
            continue;
        }

        if coverage.satisfy(&next) {
            newly.push((node.path.len() - 1, next));
        }
        snapshots.push(node.clone());
    }

    Ok((node, newly))
}

/// Next action to take, in order of preference:
/// an unsatisfied action on the same component as the last one (first by
/// name), a random unsatisfied action, a random counted action not yet on
/// the path, and finally the counted action used least on the path.
fn choose_next(
    rng: &mut dyn ChoiceRng,
    node: &SearchNode,
    coverage: &Coverage<'_>,
) -> Option<ActionId> {
    let candidates: Vec<&ActionId> = node
        .actions
        .iter()
        .filter(|a| coverage.count(a) > 0)
        .collect();
    let unsatisfied: Vec<&ActionId> = candidates
        .iter()
        .copied()
        .filter(|a| !coverage.is_satisfied(a))
        .collect();

    if let Some(last) = &node.last_action {
        if let Some(local) = unsatisfied.iter().find(|a| a.instance() == last.instance()) {
            return Some((*local).clone());
        }
    }
    if let Some(pick) = rng::choose(rng, &unsatisfied) {
        return Some((*pick).clone());
    }
    let unused: Vec<&ActionId> = candidates
        .iter()
        .copied()
        .filter(|a| !node.path.contains(a))
        .collect();
    if let Some(pick) = rng::choose(rng, &unused) {
        return Some((*pick).clone());
    }
    candidates
        .into_iter()
        .min_by_key(|a| node.path.iter().filter(|p| p == a).count())
        .cloned()
}

/// True when the path ends in two back-to-back copies of the same
/// subsequence, the second ending at the last action.
///
/// For the last action `x`, every earlier occurrence of `x` at `k` proposes
/// a period `L = n - 1 - k`; the path loops if `path[k+1-L..=k]` equals
/// `path[k+1..n]`.
pub fn ends_in_repeat(path: &[ActionId]) -> bool {
    let n = path.len();
    let Some(last) = path.last() else {
        return false;
    };
    (0..n - 1).rev().any(|k| {
        let period = n - 1 - k;
        path[k] == *last && k + 1 >= period && path[k + 1 - period..=k] == path[k + 1..n]
    })
}

/// Walk back to the newest snapshot that still has an untried action.
///
/// The action each snapshot led into is removed from its applicable set.
/// Actions satisfied after the chosen snapshot are unsatisfied again.
fn backtrack(
    snapshots: &mut Vec<SearchNode>,
    rejected: &[ActionId],
    newly: &mut Newly,
    coverage: &mut Coverage<'_>,
) -> Result<SearchNode, PlannerError> {
    while let Some(candidate) = snapshots.last_mut() {
        let depth = candidate.path.len();
        candidate.actions.remove(&rejected[depth]);
        let viable = candidate
            .actions
            .iter()
            .any(|a| Some(a) != candidate.last_action.as_ref());
        if viable {
            let rolled: Vec<ActionId> = newly
                .iter()
                .filter(|(step, _)| *step >= depth)
                .map(|(_, a)| a.clone())
                .collect();
            newly.retain(|(step, _)| *step < depth);
            coverage.unsatisfy(&rolled);
            return Ok(candidate.clone());
        }
        snapshots.pop();
    }
    Err(PlannerError::FailedToBacktrack {
        path: rejected.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use trailhead_model::{ActionDef, ComponentCatalog, DeclaredComponent};

    use crate::coverage::occurrence::PlanOccurrenceCounter;
    use crate::rng::stage_rng;

    fn id(action: &str) -> ActionId {
        ActionId::new("panel", action)
    }

    fn path(actions: &[&str]) -> Vec<ActionId> {
        actions.iter().map(|a| id(a)).collect()
    }

    fn context() -> SearchContext {
        let noop = || ActionDef::new(|_c, _p, _s, _d| Ok(()));
        let catalog = ComponentCatalog::new().with(
            DeclaredComponent::new("Panel")
                .with_entry("panel", json!({}), json!({}))
                .with_action("A", noop())
                .with_action("B", noop())
                .with_action("C", noop()),
        );
        SearchContext::new(Arc::new(catalog), Box::new(stage_rng(1, 0))).unwrap()
    }

    #[test]
    fn test_repeat_detected_for_back_to_back_copies() {
        assert!(ends_in_repeat(&path(&["A", "B", "A", "B"])));
        assert!(ends_in_repeat(&path(&["C", "A", "B", "C", "A", "B", "C"])));
        assert!(ends_in_repeat(&path(&["A", "A"])));
    }

    #[test]
    fn test_no_repeat_without_adjacent_copy() {
        assert!(!ends_in_repeat(&[]));
        assert!(!ends_in_repeat(&path(&["A"])));
        assert!(!ends_in_repeat(&path(&["A", "B", "A"])));
        assert!(!ends_in_repeat(&path(&["A", "B", "C", "B"])));
        assert!(!ends_in_repeat(&path(&["A", "B", "C", "A", "B"])));
    }

    fn snapshots(ctx: &SearchContext) -> (Vec<SearchNode>, SearchNode) {
        let root = ctx.entry_node(0).unwrap();
        let mut first = root.clone();
        apply::take_action(&mut first, &id("A")).unwrap();
        let mut current = first.clone();
        apply::take_action(&mut current, &id("B")).unwrap();
        (vec![root, first], current)
    }

    #[test]
    fn test_backtrack_resumes_at_nearest_alternative() {
        let ctx = context();
        let existing = [Plan::new(path(&["A", "B", "C"]), Vec::new())];
        let discovered = BTreeSet::new();
        let input = GreedyInput {
            existing: &existing,
            discovered: &discovered,
            counter: &PlanOccurrenceCounter,
            mode: CountingMode::PerStep,
        };
        let mut coverage = Coverage::new(&input);
        assert!(coverage.satisfy(&id("A")));
        assert!(coverage.satisfy(&id("B")));
        let mut newly = vec![(0, id("A")), (1, id("B"))];

        let (mut snaps, current) = snapshots(&ctx);
        let resumed = backtrack(&mut snaps, &current.path, &mut newly, &mut coverage).unwrap();

        assert_eq!(resumed.path, path(&["A"]));
        assert!(!resumed.actions.contains(&id("B")));
        assert_eq!(newly, vec![(0, id("A"))]);
        assert!(coverage.is_satisfied(&id("A")));
        assert!(!coverage.is_satisfied(&id("B")));
    }

    #[test]
    fn test_backtrack_skips_exhausted_snapshots() {
        let ctx = context();
        let existing = [Plan::new(path(&["A", "B", "C"]), Vec::new())];
        let discovered = BTreeSet::new();
        let input = GreedyInput {
            existing: &existing,
            discovered: &discovered,
            counter: &PlanOccurrenceCounter,
            mode: CountingMode::PerStep,
        };
        let mut coverage = Coverage::new(&input);
        coverage.satisfy(&id("A"));
        coverage.satisfy(&id("B"));
        let mut newly = vec![(0, id("A")), (1, id("B"))];

        let (mut snaps, current) = snapshots(&ctx);
        snaps[1].actions = [id("A"), id("B")].into();
        let resumed = backtrack(&mut snaps, &current.path, &mut newly, &mut coverage).unwrap();

        assert!(resumed.path.is_empty());
        assert_eq!(resumed.actions, BTreeSet::from([id("B"), id("C")]));
        assert_eq!(snaps.len(), 1);
        assert!(newly.is_empty());
        assert!(coverage.satisfied.is_empty());
    }

    #[test]
    fn test_backtrack_fails_when_no_alternative() {
        let ctx = context();
        let existing = [Plan::new(path(&["A", "B"]), Vec::new())];
        let discovered = BTreeSet::new();
        let input = GreedyInput {
            existing: &existing,
            discovered: &discovered,
            counter: &PlanOccurrenceCounter,
            mode: CountingMode::PerStep,
        };
        let mut coverage = Coverage::new(&input);
        let mut newly = Vec::new();

        let (mut snaps, current) = snapshots(&ctx);
        snaps[0].actions = [id("A")].into();
        snaps[1].actions = [id("A"), id("B")].into();
        let err = backtrack(&mut snaps, &current.path, &mut newly, &mut coverage).unwrap_err();
        assert_eq!(err.code(), "PLANNER.FAILED_TO_BACKTRACK");
        assert!(snaps.is_empty());
    }

    #[test]
    fn test_satisfied_existing_plans_are_pruned() {
        let existing = [
            Plan::new(path(&["A"]), Vec::new()),
            Plan::new(path(&["B", "C"]), Vec::new()),
        ];
        let discovered = BTreeSet::new();
        let input = GreedyInput {
            existing: &existing,
            discovered: &discovered,
            counter: &PlanOccurrenceCounter,
            mode: CountingMode::PerStep,
        };
        let mut coverage = Coverage::new(&input);
        coverage.satisfy(&id("A"));
        assert_eq!(coverage.kept, vec![1]);
        assert_eq!(coverage.count(&id("A")), 0);
        coverage.unsatisfy(&[id("A")]);
        assert_eq!(coverage.kept, vec![0, 1]);
        assert_eq!(coverage.count(&id("A")), 1);
    }

    #[test]
    fn test_same_component_preferred() {
        let ctx = context();
        let existing = [Plan::new(path(&["A", "B", "C"]), Vec::new())];
        let discovered = BTreeSet::new();
        let input = GreedyInput {
            existing: &existing,
            discovered: &discovered,
            counter: &PlanOccurrenceCounter,
            mode: CountingMode::PerStep,
        };
        let mut coverage = Coverage::new(&input);
        coverage.satisfy(&id("A"));
        let mut node = ctx.entry_node(0).unwrap();
        apply::take_action(&mut node, &id("A")).unwrap();
        node.actions.remove(&id("A"));
        let mut rng = stage_rng(9, 0);
        assert_eq!(choose_next(&mut rng, &node, &coverage), Some(id("B")));
    }
}
