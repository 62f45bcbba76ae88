//! Plan-set side of planning: trimming witness plans down, counting what
//! they cover, and stitching the rest into longer plans.

pub mod greedy;
pub mod occurrence;
pub mod reduce;

pub use greedy::{greedy_search, GreedyConfig, GreedyInput, GreedyResult};
pub use occurrence::{CountingMode, OccurrenceCounter, OccurrenceReport, PlanOccurrenceCounter};
pub use reduce::reduce;
