//! Test-plan search over an expected-state model.
//!
//! `search` holds the state-space side (search nodes, applicability,
//! effects, best-first witness search); `coverage` holds the plan-set side
//! (reduction, occurrence counting, greedy coverage construction).

pub mod context;
pub mod coverage;
pub mod error;
pub mod plan;
pub mod rng;
pub mod search;

pub use context::{SearchContext, SearchStats};
pub use error::PlannerError;
pub use plan::Plan;
pub use search::node::SearchNode;
