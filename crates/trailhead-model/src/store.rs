use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scratch key/value store threaded through every precondition, parameter
/// generator and effect call.
///
/// Keys are kept sorted so `retrieve_all` snapshots are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataStore {
    values: BTreeMap<String, Value>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the previous one under the same key.
    pub fn store(&mut self, key: &str, value: Value) -> Option<Value> {
        self.values.insert(key.to_string(), value)
    }

    pub fn retrieve(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Snapshot of every stored value as a JSON object.
    pub fn retrieve_all(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
