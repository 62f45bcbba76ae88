//! Best-first forward search that finds one witness plan per discovered
//! action.
//!
//! Frontier priority is `(path length, unwitnessed applicable actions)`,
//! both ascending: shortest paths first, and among equals the node with the
//! least left to explore. Witnessing a goal lowers the priority of every
//! node that could still reach it, so the frontier re-buckets its nodes on
//! the next pop after the witnessed set grows.
//!
//! A state (expected state plus data store) is expanded at most once.
//! Paths are popped shortest-first, so the first expansion of a state is
//! also its shortest, and the search ends on any finite state space.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trailhead_ir::ActionId;

use crate::context::SearchContext;
use crate::error::PlannerError;
use crate::plan::Plan;
use crate::search::apply;
use crate::search::node::SearchNode;
use crate::search::possible;

/// Forward-search limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Stop with `GoalNotFound` after this many node expansions.
    /// `None` searches until the frontier is exhausted.
    pub max_expansions: Option<u64>,
}

/// Witness plans in discovery order, plus the action sets seen on the way.
#[derive(Debug, Clone, Default)]
pub struct ForwardResult {
    pub plans: Vec<Plan>,
    /// Actions that were applicable in at least one explored state.
    pub discovered: BTreeSet<ActionId>,
    /// Actions exposed by any component registered in an explored state.
    pub all_actions: BTreeSet<ActionId>,
    pub expansions: u64,
}

#[derive(Default)]
struct Goals {
    discovered: BTreeSet<ActionId>,
    found: BTreeSet<ActionId>,
}

impl Goals {
    fn unfound(&self, node: &SearchNode) -> usize {
        node.actions.iter().filter(|a| !self.found.contains(*a)).count()
    }

    fn complete(&self, target: Option<&ActionId>) -> bool {
        match target {
            Some(t) => self.found.contains(t),
            None => self.discovered.iter().all(|a| self.found.contains(a)),
        }
    }

    fn missing(&self, target: Option<&ActionId>) -> Vec<ActionId> {
        match target {
            Some(t) => vec![t.clone()],
            None => self.discovered.difference(&self.found).cloned().collect(),
        }
    }
}

/// Nodes bucketed by `(path length, unfound)`, FIFO within a bucket.
/// Popped nodes leave the map, so it only holds the live frontier.
#[derive(Default)]
struct Frontier {
    buckets: BTreeMap<(usize, usize), VecDeque<SearchNode>>,
    /// Size of `goals.found` the bucket keys were computed against.
    keyed_at: usize,
}

impl Frontier {
    fn push(&mut self, node: SearchNode, goals: &Goals) {
        let key = (node.path.len(), goals.unfound(&node));
        self.buckets.entry(key).or_default().push_back(node);
    }

    fn pop(&mut self, goals: &Goals) -> Option<SearchNode> {
        self.rekey(goals);
        let mut entry = self.buckets.first_entry()?;
        let node = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }
        node
    }

    /// Move every node to the bucket matching its current unfound count.
    /// `goals.found` only grows, so an unchanged size means no key is stale.
    fn rekey(&mut self, goals: &Goals) {
        if goals.found.len() == self.keyed_at {
            return;
        }
        self.keyed_at = goals.found.len();
        let stale = std::mem::take(&mut self.buckets);
        for ((length, _), nodes) in stale {
            for node in nodes {
                let key = (length, goals.unfound(&node));
                self.buckets.entry(key).or_default().push_back(node);
            }
        }
    }

    fn len(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }
}

/// Search from every entry point until each discovered action (or only
/// `target`, when given) has a witness plan ending in it.
///
/// Returns `GoalNotFound` naming the unwitnessed actions if the frontier
/// runs dry or the expansion budget is spent first.
pub fn forward_search(
    ctx: &mut SearchContext,
    config: &ForwardConfig,
    target: Option<&ActionId>,
) -> Result<ForwardResult, PlannerError> {
    let mut goals = Goals::default();
    let mut frontier = Frontier::default();
    let mut expanded: HashSet<String> = HashSet::new();
    let mut result = ForwardResult::default();

    for index in 0..ctx.entry_points().len() {
        let root = ctx.entry_node(index)?;
        debug!(
            entry = root.entry_name(),
            applicable = root.actions.len(),
            "forward search root"
        );
        goals.discovered.extend(root.actions.iter().cloned());
        result.all_actions.extend(root.all_actions.iter().cloned());
        frontier.push(root, &goals);
    }

    if target.is_none() && goals.complete(None) {
        result.discovered = goals.discovered;
        return Ok(result);
    }

    loop {
        if config.max_expansions.is_some_and(|max| result.expansions >= max) {
            debug!(expansions = result.expansions, "forward expansion budget spent");
            return Err(PlannerError::GoalNotFound {
                missing: goals.missing(target),
            });
        }
        let Some(node) = frontier.pop(&goals) else {
            return Err(PlannerError::GoalNotFound {
                missing: goals.missing(target),
            });
        };
        if !expanded.insert(node.fingerprint()) {
            continue;
        }
        result.expansions += 1;
        ctx.stats.nodes_expanded += 1;
        debug!(
            depth = node.path.len(),
            applicable = node.actions.len(),
            found = goals.found.len(),
            discovered = goals.discovered.len(),
            frontier = frontier.len(),
            "expanding node"
        );

        for action in &node.actions {
            let mut child = node.branch(action);
            apply::apply(&mut child)?;
            ctx.stats.effects_applied += 1;
            possible::refresh(&mut child)?;

            goals.discovered.extend(child.actions.iter().cloned());
            result.all_actions.extend(child.all_actions.iter().cloned());

            if goals.found.insert(action.clone()) {
                info!(action = %action, length = child.path.len(), "witness plan found");
                result.plans.push(child.to_plan());
                if goals.complete(target) {
                    result.discovered = goals.discovered;
                    return Ok(result);
                }
            }
            if !expanded.contains(&child.fingerprint()) {
                frontier.push(child, &goals);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use trailhead_ir::Precondition;
    use trailhead_model::{ActionDef, ComponentCatalog, DeclaredComponent};

    use crate::rng::stage_rng;

    fn pager() -> ComponentCatalog {
        let next = ActionDef::new(|component, _params, state, _store| {
            state.modify(component.name(), |s| {
                s["page"] = json!(s["page"].as_i64().unwrap_or(0) + 1);
            })?;
            Ok(())
        })
        .with_preconditions(|component, _params, _store| {
            Ok(vec![Precondition::with_expected(
                trailhead_ir::AssertionKind::IsBelow,
                &format!("state.{}.page", component.name()),
                json!(3),
            )])
        });
        let done = ActionDef::new(|_c, _p, _s, _d| Ok(())).with_preconditions(|component, _p, _d| {
            Ok(vec![Precondition::equal(
                &format!("state.{}.page", component.name()),
                json!(3),
            )])
        });
        ComponentCatalog::new().with(
            DeclaredComponent::new("Pager")
                .with_entry("pager", json!({"page": 0}), json!({}))
                .with_action("NEXT", next)
                .with_action("DONE", done),
        )
    }

    /// FLIP toggles `on` back and forth; JAM needs `on == 2`.
    fn switch() -> ComponentCatalog {
        let flip = ActionDef::new(|component, _params, state, _store| {
            state.modify(component.name(), |s| {
                s["on"] = json!(!s["on"].as_bool().unwrap_or(false));
            })?;
            Ok(())
        });
        let jam = ActionDef::new(|_c, _p, _s, _d| Ok(())).with_preconditions(|component, _p, _d| {
            Ok(vec![Precondition::equal(
                &format!("state.{}.on", component.name()),
                json!(2),
            )])
        });
        ComponentCatalog::new().with(
            DeclaredComponent::new("Switch")
                .with_entry("switch", json!({"on": false}), json!({}))
                .with_action("FLIP", flip)
                .with_action("JAM", jam),
        )
    }

    fn with_actions(node: &SearchNode, names: &[&str]) -> SearchNode {
        let mut node = node.clone();
        node.actions = names.iter().map(|n| ActionId::new("pager", n)).collect();
        node
    }

    fn context(catalog: ComponentCatalog) -> SearchContext {
        SearchContext::new(Arc::new(catalog), Box::new(stage_rng(42, 0))).unwrap()
    }

    #[test]
    fn test_frontier_prefers_shorter_then_fewer_unfound() {
        let ctx = context(pager());
        let root = ctx.entry_node(0).unwrap();
        let goals = Goals::default();
        let mut frontier = Frontier::default();

        let mut deep = root.branch(&ActionId::new("pager", "NEXT"));
        apply::apply(&mut deep).unwrap();
        frontier.push(deep, &goals);
        frontier.push(root, &goals);

        assert_eq!(frontier.pop(&goals).unwrap().path.len(), 0);
        assert_eq!(frontier.pop(&goals).unwrap().path.len(), 1);
        assert!(frontier.pop(&goals).is_none());
    }

    #[test]
    fn test_frontier_rebuckets_when_goals_are_witnessed() {
        let ctx = context(pager());
        let root = ctx.entry_node(0).unwrap();
        let wide = with_actions(&root, &["A", "B"]);
        let narrow = with_actions(&root, &["C"]);

        let goals = Goals::default();
        let mut frontier = Frontier::default();
        frontier.push(wide.clone(), &goals);
        frontier.push(narrow.clone(), &goals);
        assert_eq!(frontier.pop(&goals).unwrap().actions, narrow.actions);
        assert_eq!(frontier.pop(&goals).unwrap().actions, wide.actions);

        let mut goals = Goals::default();
        let mut frontier = Frontier::default();
        frontier.push(wide.clone(), &goals);
        frontier.push(narrow.clone(), &goals);
        goals.found.insert(ActionId::new("pager", "A"));
        goals.found.insert(ActionId::new("pager", "B"));
        assert_eq!(frontier.pop(&goals).unwrap().actions, wide.actions);
        assert_eq!(frontier.pop(&goals).unwrap().actions, narrow.actions);
        assert!(frontier.pop(&goals).is_none());
        assert_eq!(frontier.len(), 0);
    }

    #[test]
    fn test_revisited_states_are_not_expanded_again() {
        let mut ctx = context(switch());
        let jam = ActionId::new("switch", "JAM");
        match forward_search(&mut ctx, &ForwardConfig::default(), Some(&jam)) {
            Err(PlannerError::GoalNotFound { missing }) => assert_eq!(missing, vec![jam]),
            other => panic!("expected GoalNotFound, got {other:?}"),
        }
        // off, then on; flipping back lands on an expanded state.
        assert_eq!(ctx.stats.nodes_expanded, 2);
        assert_eq!(ctx.stats.effects_applied, 2);
    }

    #[test]
    fn test_untargeted_search_stops_once_discovered_goals_are_witnessed() {
        let mut ctx = context(pager());
        let result = forward_search(&mut ctx, &ForwardConfig::default(), None).unwrap();
        assert_eq!(result.plans.len(), 1);
        assert_eq!(result.plans[0].path(), &[ActionId::new("pager", "NEXT")]);
        assert!(result.all_actions.contains(&ActionId::new("pager", "DONE")));
        assert!(!result.discovered.contains(&ActionId::new("pager", "DONE")));
    }

    #[test]
    fn test_witness_for_deep_target() {
        let mut ctx = context(pager());
        let done = ActionId::new("pager", "DONE");
        let result = forward_search(&mut ctx, &ForwardConfig::default(), Some(&done)).unwrap();
        let witness = result
            .plans
            .iter()
            .find(|p| p.path().last() == Some(&done))
            .unwrap();
        assert_eq!(witness.len(), 4);
        assert_eq!(result.plans.len(), 2);
    }

    #[test]
    fn test_expansion_budget_reports_missing() {
        let mut ctx = context(pager());
        let config = ForwardConfig {
            max_expansions: Some(1),
        };
        let done = ActionId::new("pager", "DONE");
        match forward_search(&mut ctx, &config, Some(&done)) {
            Err(PlannerError::GoalNotFound { missing }) => {
                assert_eq!(missing, vec![ActionId::new("pager", "DONE")]);
            }
            other => panic!("expected GoalNotFound, got {other:?}"),
        }
    }
}
