//! State-space side of planning.

pub mod apply;
pub mod forward;
pub mod node;
pub mod possible;
pub mod replay;

pub use apply::{apply, take_action};
pub use forward::{forward_search, ForwardConfig, ForwardResult};
pub use possible::{check_if_possible, Applicability, PossibleActions};
pub use replay::verify_plan;
