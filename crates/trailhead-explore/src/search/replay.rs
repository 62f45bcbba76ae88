use std::sync::Arc;

use trailhead_ir::{ActionId, TestStep};
use trailhead_model::ComponentCatalog;

use crate::error::PlannerError;
use crate::plan::Plan;
use crate::search::apply;
use crate::search::node::SearchNode;
use crate::search::possible;

/// Replay a test case from its entry step, checking that every action is
/// applicable at the point it is taken. Recorded parameters are reused
/// verbatim.
///
/// Returns the final node on success.
pub fn verify_test_case(
    catalog: Arc<ComponentCatalog>,
    test_case: &[TestStep],
) -> Result<SearchNode, PlannerError> {
    let (entry, steps) = test_case
        .split_first()
        .ok_or_else(|| PlannerError::MalformedTestCase {
            reason: "test case has no entry step".to_string(),
        })?;
    let config = entry
        .entry_config()
        .ok_or_else(|| PlannerError::MalformedTestCase {
            reason: format!("entry step '{}' carries no component config", entry.name),
        })?;

    let mut node = SearchNode::entry(catalog, &config)?;
    for (offset, step) in steps.iter().enumerate() {
        let index = offset + 1;
        let id = ActionId::parse(&step.name).ok_or_else(|| PlannerError::MalformedTestCase {
            reason: format!("step {index} name '{}' is not instance.ACTION", step.name),
        })?;
        let component = node
            .state
            .retrieve_component(id.instance())
            .cloned()
            .ok_or_else(|| PlannerError::UnknownAction { action: id.clone() })?;
        let action = component
            .action(id.action())
            .cloned()
            .ok_or_else(|| PlannerError::UnknownAction { action: id.clone() })?;

        let check = match step.parameters() {
            Some(parameters) => {
                let mut scratch = node.data_store.clone();
                possible::check_with_parameters(
                    &component,
                    &id,
                    &action,
                    parameters,
                    &node.state,
                    &mut scratch,
                )?
            }
            None => possible::check_if_possible(
                &component,
                &id,
                &action,
                &node.state,
                &node.data_store,
            )?,
        };
        if !check.applicable {
            return Err(PlannerError::PlanNotReplayable {
                index,
                action: step.name.clone(),
                unmet: check.unmet,
            });
        }

        if let Some(parameters) = step.parameters() {
            node.freeze_parameters(node.path.len(), parameters.to_vec());
        }
        node.path.push(id);
        apply::apply(&mut node)?;
    }
    possible::refresh(&mut node)?;
    Ok(node)
}

/// Replay a finished plan. Fails if any step is not applicable when taken.
pub fn verify_plan(catalog: Arc<ComponentCatalog>, plan: &Plan) -> Result<SearchNode, PlannerError> {
    verify_test_case(catalog, plan.test_case())
}
