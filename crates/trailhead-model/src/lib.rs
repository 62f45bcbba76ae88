//! Simulated UI model: component action models, the expected-state tree the
//! planner mutates, the scratch data store, and precondition evaluation.

pub mod catalog;
pub mod component;
pub mod eval;
pub mod state;
pub mod store;

pub use catalog::ComponentCatalog;
pub use component::{
    ActionDef, ActionError, ActionTable, ComponentInstance, ComponentModel, DeclaredComponent,
    EntryComponent, ParamGenerator,
};
pub use state::{ExpectedState, ExpectedStateError};
pub use store::DataStore;
