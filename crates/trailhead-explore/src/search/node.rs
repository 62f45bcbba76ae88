use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use trailhead_ir::{ActionId, ComponentConfig, TestStep};
use trailhead_model::{ComponentCatalog, DataStore, ExpectedState};

use crate::error::PlannerError;
use crate::plan::{self, Plan};

/// One point in the search: a simulated UI state reached by a path of
/// actions from an entry component.
///
/// Nodes own everything they touch. Branching clones the node, so no two
/// branches ever share expected state or data store.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub state: ExpectedState,
    pub data_store: DataStore,
    pub path: Vec<ActionId>,
    /// Actions applicable in this state.
    pub actions: BTreeSet<ActionId>,
    /// Every action exposed by a registered component, applicable or not.
    pub all_actions: BTreeSet<ActionId>,
    pub test_case: Vec<TestStep>,
    pub last_action: Option<ActionId>,
    /// Parameters generated for a path step, keyed by step index.
    frozen_parameters: BTreeMap<usize, Vec<Value>>,
}

impl SearchNode {
    /// Root node: a fresh expected state holding only the entry component.
    ///
    /// Applicable actions are left empty; see [`crate::search::possible::refresh`].
    pub fn entry(
        catalog: Arc<ComponentCatalog>,
        config: &ComponentConfig,
    ) -> Result<Self, PlannerError> {
        let mut state = ExpectedState::new(catalog);
        state.create_and_add_component(config.clone())?;
        Ok(Self {
            state,
            data_store: DataStore::new(),
            path: Vec::new(),
            actions: BTreeSet::new(),
            all_actions: BTreeSet::new(),
            test_case: vec![TestStep::entry(config)?],
            last_action: None,
            frozen_parameters: BTreeMap::new(),
        })
    }

    /// Independent copy with `action` appended to the path, ready for
    /// [`crate::search::apply::apply`].
    pub fn branch(&self, action: &ActionId) -> Self {
        let mut child = self.clone();
        child.path.push(action.clone());
        child
    }

    /// Name of the entry component this node was rooted at.
    pub fn entry_name(&self) -> &str {
        self.test_case.first().map(|s| s.name.as_str()).unwrap_or_default()
    }

    pub fn frozen_parameters(&self, step: usize) -> Option<&Vec<Value>> {
        self.frozen_parameters.get(&step)
    }

    pub fn freeze_parameters(&mut self, step: usize, parameters: Vec<Value>) {
        self.frozen_parameters.insert(step, parameters);
    }

    /// Expected state and data store as one comparable key. Nodes with
    /// equal fingerprints have the same futures, whatever their paths.
    pub fn fingerprint(&self) -> String {
        format!("{}{}", self.state.fingerprint(), self.data_store.retrieve_all())
    }

    pub fn path_hash(&self) -> u64 {
        plan::path_hash(&self.path)
    }

    pub fn to_plan(&self) -> Plan {
        Plan::new(self.path.clone(), self.test_case.clone())
    }
}
