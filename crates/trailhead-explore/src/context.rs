use std::sync::Arc;

use serde::Serialize;
use trailhead_ir::ComponentConfig;
use trailhead_model::ComponentCatalog;

use crate::error::PlannerError;
use crate::rng::ChoiceRng;
use crate::search::node::SearchNode;
use crate::search::possible;

/// Counters collected over one planning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Nodes popped and expanded by the forward search.
    pub nodes_expanded: u64,
    /// Action effects applied across both phases.
    pub effects_applied: u64,
    /// Repeated-subsequence loops the greedy search detected.
    pub loops_detected: u64,
    pub backtracks: u64,
    /// Greedy plan attempts discarded for satisfying nothing new.
    pub discarded_attempts: u64,
}

/// Everything a planning run shares: the component catalog, the entry
/// points derived from it, the choice source, and run counters.
///
/// Passed explicitly into each phase; there is no process-wide planner
/// state.
pub struct SearchContext {
    catalog: Arc<ComponentCatalog>,
    entry_points: Vec<ComponentConfig>,
    rng: Box<dyn ChoiceRng>,
    pub stats: SearchStats,
}

impl SearchContext {
    pub fn new(
        catalog: Arc<ComponentCatalog>,
        rng: Box<dyn ChoiceRng>,
    ) -> Result<Self, PlannerError> {
        let entry_points = catalog.entry_points();
        if entry_points.is_empty() {
            return Err(PlannerError::NoEntryPoint);
        }
        Ok(Self {
            catalog,
            entry_points,
            rng,
            stats: SearchStats::default(),
        })
    }

    pub fn catalog(&self) -> &Arc<ComponentCatalog> {
        &self.catalog
    }

    pub fn entry_points(&self) -> &[ComponentConfig] {
        &self.entry_points
    }

    pub fn rng(&mut self) -> &mut dyn ChoiceRng {
        self.rng.as_mut()
    }

    /// Fresh root node for an entry point, with applicable actions computed.
    pub fn entry_node(&self, index: usize) -> Result<SearchNode, PlannerError> {
        let config = &self.entry_points[index % self.entry_points.len()];
        let mut node = SearchNode::entry(Arc::clone(&self.catalog), config)?;
        possible::refresh(&mut node)?;
        Ok(node)
    }
}

impl std::fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchContext")
            .field("entry_points", &self.entry_points.len())
            .field("stats", &self.stats)
            .finish()
    }
}
