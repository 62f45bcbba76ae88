use tracing::trace;
use trailhead_ir::{ActionId, TestStep};

use crate::error::PlannerError;
use crate::search::node::SearchNode;
use crate::search::possible;

/// Apply the effects of the last action on the node's path, mutating the
/// node in place.
///
/// Parameters are generated once per path step and frozen on the node, so
/// replaying or cloning the node never regenerates them. Preconditions are
/// re-run on the real data store before effects so that stores a
/// precondition function writes are visible to the effects.
pub fn apply(node: &mut SearchNode) -> Result<(), PlannerError> {
    let id = node.path.last().cloned().ok_or(PlannerError::EmptyPath)?;
    let step = node.path.len() - 1;

    let component = node
        .state
        .retrieve_component(id.instance())
        .cloned()
        .ok_or_else(|| PlannerError::UnknownAction { action: id.clone() })?;
    let action = component
        .action(id.action())
        .cloned()
        .ok_or_else(|| PlannerError::UnknownAction { action: id.clone() })?;

    let parameters = match node.frozen_parameters(step) {
        Some(frozen) => frozen.clone(),
        None if action.has_parameters() => {
            let generated = action
                .generate_parameters(&component, &mut node.data_store)
                .map_err(|source| PlannerError::Parameter {
                    action: id.clone(),
                    source,
                })?;
            node.freeze_parameters(step, generated.clone());
            generated
        }
        None => Vec::new(),
    };

    if action.has_preconditions() {
        action
            .preconditions(&component, &parameters, &mut node.data_store)
            .map_err(|source| PlannerError::Precondition {
                action: id.clone(),
                source,
            })?;
    }

    action
        .effects(&component, &parameters, &mut node.state, &mut node.data_store)
        .map_err(|source| PlannerError::Effect {
            action: id.clone(),
            source,
        })?;

    let recorded = action.has_parameters().then_some(parameters);
    node.test_case.push(TestStep::action(&id, recorded));
    node.last_action = Some(id.clone());
    trace!(action = %id, step, "effects applied");
    Ok(())
}

/// Append `action` to the path, apply it, and recompute applicable actions.
pub fn take_action(node: &mut SearchNode, action: &ActionId) -> Result<(), PlannerError> {
    node.path.push(action.clone());
    apply(node)?;
    possible::refresh(node)
}
