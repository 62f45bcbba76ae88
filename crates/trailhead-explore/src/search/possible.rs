use std::collections::BTreeSet;

use serde_json::Value;
use tracing::trace;
use trailhead_ir::{ActionId, Precondition};
use trailhead_model::eval::{self, Unmet};
use trailhead_model::{ActionDef, ComponentInstance, DataStore, ExpectedState};

use crate::error::PlannerError;
use crate::search::node::SearchNode;

/// Applicable and exposed actions for one state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PossibleActions {
    pub applicable: BTreeSet<ActionId>,
    pub all: BTreeSet<ActionId>,
}

/// Outcome of checking one action against one state.
#[derive(Debug, Clone)]
pub struct Applicability {
    pub applicable: bool,
    pub parameters: Vec<Value>,
    pub preconditions: Vec<Precondition>,
    pub unmet: Vec<Unmet>,
}

/// Evaluate every action of every registered component.
///
/// Parameter generators and precondition functions run against a scratch
/// copy of the data store per action; the caller's store is never written.
pub fn get(state: &ExpectedState, data_store: &DataStore) -> Result<PossibleActions, PlannerError> {
    let mut possible = PossibleActions::default();
    for component in state.get_components() {
        for (name, action) in component.actions() {
            let id = component.action_id(name);
            let check = check_if_possible(component, &id, action, state, data_store)?;
            if check.applicable {
                possible.applicable.insert(id.clone());
            } else {
                trace!(action = %id, unmet = check.unmet.len(), "action not applicable");
            }
            possible.all.insert(id);
        }
    }
    Ok(possible)
}

/// Recompute a node's applicable and exposed actions from its current state.
pub fn refresh(node: &mut SearchNode) -> Result<(), PlannerError> {
    let possible = get(&node.state, &node.data_store)?;
    node.actions = possible.applicable;
    node.all_actions = possible.all;
    Ok(())
}

/// Generate parameters, then check the action's preconditions against them.
pub fn check_if_possible(
    component: &ComponentInstance,
    id: &ActionId,
    action: &ActionDef,
    state: &ExpectedState,
    data_store: &DataStore,
) -> Result<Applicability, PlannerError> {
    if !action.has_preconditions() {
        return Ok(Applicability {
            applicable: true,
            parameters: Vec::new(),
            preconditions: Vec::new(),
            unmet: Vec::new(),
        });
    }
    let mut scratch = data_store.clone();
    let parameters = action
        .generate_parameters(component, &mut scratch)
        .map_err(|source| PlannerError::Parameter {
            action: id.clone(),
            source,
        })?;
    check_with_parameters(component, id, action, &parameters, state, &mut scratch)
}

/// Check preconditions for already-chosen parameters.
///
/// `scratch` may be written by the precondition function; the snapshot is
/// taken afterwards so those writes are visible to the assertions.
pub fn check_with_parameters(
    component: &ComponentInstance,
    id: &ActionId,
    action: &ActionDef,
    parameters: &[Value],
    state: &ExpectedState,
    scratch: &mut DataStore,
) -> Result<Applicability, PlannerError> {
    let preconditions = action
        .preconditions(component, parameters, scratch)
        .map_err(|source| PlannerError::Precondition {
            action: id.clone(),
            source,
        })?;
    let unmet = if preconditions.is_empty() {
        Vec::new()
    } else {
        let snapshot = eval::snapshot(state, scratch);
        eval::check_preconditions(&preconditions, &snapshot).map_err(|source| {
            PlannerError::Assertion {
                action: id.clone(),
                source,
            }
        })?
    };
    Ok(Applicability {
        applicable: unmet.is_empty(),
        parameters: parameters.to_vec(),
        preconditions,
        unmet,
    })
}
