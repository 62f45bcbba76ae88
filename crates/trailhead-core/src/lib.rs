//! Top-level planning run: configuration, the forward -> reduce -> greedy
//! pipeline, and run summaries.

pub mod config;
pub mod run;
pub mod summary;

pub use config::{ConfigError, PlannerConfig};
pub use run::{plan_for_action, run_planner, PlanningOutcome};
pub use summary::{CoverageStatus, RunSummary};
