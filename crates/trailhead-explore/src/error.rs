use trailhead_ir::ActionId;
use trailhead_model::eval::{AssertionError, Unmet};
use trailhead_model::{ActionError, ExpectedStateError};

fn join(ids: &[ActionId]) -> String {
    ids.iter().map(ActionId::as_str).collect::<Vec<_>>().join(", ")
}

/// Errors surfaced by a planning run. Every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("no component declares an entry point")]
    NoEntryPoint,

    #[error("no applicable action to start a plan from entry component '{entry}'")]
    NoStartingActions { entry: String },

    #[error("search frontier exhausted before witnessing: [{}]", join(.missing))]
    GoalNotFound { missing: Vec<ActionId> },

    #[error("loop detected but no earlier step has an alternative: [{}]", join(.path))]
    FailedToBacktrack { path: Vec<ActionId> },

    #[error("duplicate plan generated: [{}]", join(.path))]
    DuplicatePlanGenerated { path: Vec<ActionId> },

    #[error("expected state error: {0}")]
    ExpectedState(#[from] ExpectedStateError),

    #[error("preconditions of '{action}' failed: {source}")]
    Precondition { action: ActionId, source: ActionError },

    #[error("parameter generation for '{action}' failed: {source}")]
    Parameter { action: ActionId, source: ActionError },

    #[error("effects of '{action}' failed: {source}")]
    Effect { action: ActionId, source: ActionError },

    #[error("malformed precondition on '{action}': {source}")]
    Assertion {
        action: ActionId,
        source: AssertionError,
    },

    #[error("action '{action}' does not exist on a registered component")]
    UnknownAction { action: ActionId },

    #[error("cannot apply effects: the search node has an empty path")]
    EmptyPath,

    #[error("step {index} ('{action}') is not applicable on replay ({} unmet precondition(s))", .unmet.len())]
    PlanNotReplayable {
        index: usize,
        action: String,
        unmet: Vec<Unmet>,
    },

    #[error("malformed test case: {reason}")]
    MalformedTestCase { reason: String },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PlannerError {
    /// Stable `PLANNER.<KIND>` code for callers that map errors to exit codes.
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::NoEntryPoint => "PLANNER.NO_ENTRY_POINT",
            PlannerError::NoStartingActions { .. } => "PLANNER.NO_STARTING_ACTIONS",
            PlannerError::GoalNotFound { .. } => "PLANNER.GOAL_NOT_FOUND",
            PlannerError::FailedToBacktrack { .. } => "PLANNER.FAILED_TO_BACKTRACK",
            PlannerError::DuplicatePlanGenerated { .. } => "PLANNER.DUPLICATE_PLAN_GENERATED",
            PlannerError::ExpectedState(_) => "PLANNER.EXPECTED_STATE_ERROR",
            PlannerError::Precondition { .. } => "PLANNER.PRECONDITION_ERROR",
            PlannerError::Parameter { .. } => "PLANNER.PARAMETER_ERROR",
            PlannerError::Effect { .. } => "PLANNER.EFFECT_ERROR",
            PlannerError::Assertion { .. } => "PLANNER.ASSERTION_ERROR",
            PlannerError::UnknownAction { .. } => "PLANNER.UNKNOWN_ACTION",
            PlannerError::EmptyPath => "PLANNER.EMPTY_PATH",
            PlannerError::PlanNotReplayable { .. } => "PLANNER.PLAN_NOT_REPLAYABLE",
            PlannerError::MalformedTestCase { .. } => "PLANNER.MALFORMED_TEST_CASE",
            PlannerError::Serialize(_) => "PLANNER.SERIALIZE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_not_found_names_missing_actions() {
        let err = PlannerError::GoalNotFound {
            missing: vec![ActionId::new("login", "LOGOUT"), ActionId::new("nav", "HOME")],
        };
        assert_eq!(err.code(), "PLANNER.GOAL_NOT_FOUND");
        assert_eq!(
            err.to_string(),
            "search frontier exhausted before witnessing: [login.LOGOUT, nav.HOME]"
        );
    }

    #[test]
    fn test_wrapped_action_error_names_action() {
        let err = PlannerError::Effect {
            action: ActionId::new("cart", "ADD"),
            source: ActionError::msg("out of stock"),
        };
        assert_eq!(err.code(), "PLANNER.EFFECT_ERROR");
        assert!(err.to_string().contains("cart.ADD"));
        assert!(err.to_string().contains("out of stock"));
    }

    #[test]
    fn test_expected_state_error_converts() {
        let err: PlannerError = ExpectedStateError::EmptyStash.into();
        assert_eq!(err.code(), "PLANNER.EXPECTED_STATE_ERROR");
    }
}
