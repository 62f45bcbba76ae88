//! Declarative data shared by every trailhead crate: action identifiers,
//! component registration configs, test-case steps and the precondition
//! assertion DSL.

pub mod assertion;
pub mod parse;
pub mod types;

pub use assertion::{AssertionKind, Precondition};
pub use types::{ActionId, ComponentConfig, StepOptions, TestStep};
