use std::collections::{BTreeSet, HashSet};

use tracing::debug;
use trailhead_ir::ActionId;

use crate::plan::Plan;

/// Drop every plan whose action set is covered by another plan's.
///
/// A plan is dropped when some other plan's set is a strict superset of it,
/// or when an earlier surviving plan has the same set. Exact duplicate paths
/// are dropped on sight. Earlier plans win ties, so the result is stable
/// and `reduce(reduce(p)) == reduce(p)`.
pub fn reduce(plans: &[Plan]) -> Vec<Plan> {
    let sets: Vec<BTreeSet<ActionId>> = plans.iter().map(Plan::action_set).collect();
    let mut seen_paths = HashSet::new();
    let mut kept: Vec<usize> = Vec::new();

    for (i, set) in sets.iter().enumerate() {
        if !seen_paths.insert(plans[i].path_hash()) {
            continue;
        }
        let strictly_covered = sets
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.len() > set.len() && set.is_subset(other));
        let equal_kept = kept.iter().any(|&k| sets[k] == *set);
        if !strictly_covered && !equal_kept {
            kept.push(i);
        }
    }

    debug!(before = plans.len(), after = kept.len(), "reduced plan set");
    kept.into_iter().map(|i| plans[i].clone()).collect()
}
