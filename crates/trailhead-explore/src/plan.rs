use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};
use trailhead_ir::{ActionId, TestStep};

/// A finished test plan: the action path plus the test-case trace it
/// produced. Serializes as the bare test-case array.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    path: Vec<ActionId>,
    test_case: Vec<TestStep>,
}

impl Plan {
    pub fn new(path: Vec<ActionId>, test_case: Vec<TestStep>) -> Self {
        Self { path, test_case }
    }

    pub fn path(&self) -> &[ActionId] {
        &self.path
    }

    pub fn test_case(&self) -> &[TestStep] {
        &self.test_case
    }

    /// Distinct actions on the path.
    pub fn action_set(&self) -> BTreeSet<ActionId> {
        self.path.iter().cloned().collect()
    }

    pub fn path_hash(&self) -> u64 {
        path_hash(&self.path)
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl Serialize for Plan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.test_case.serialize(serializer)
    }
}

/// Hash of an action path, used to recognise plans that were already
/// produced.
pub fn path_hash(path: &[ActionId]) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.len().hash(&mut hasher);
    for action in path {
        action.as_str().hash(&mut hasher);
    }
    hasher.finish()
}

/// Serialize a plan set as a JSON array of test cases.
pub fn plans_to_json(plans: &[Plan]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(plans)
}
