use serde_json::Value;
use trailhead_ir::{AssertionKind, Precondition};

use crate::state::ExpectedState;
use crate::store::DataStore;

#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    #[error("subject path '{path}' must start with 'state' or 'dataStore'")]
    UnknownRoot { path: String },

    #[error("{kind} expects {expected} argument(s), got {actual}")]
    Arity {
        kind: AssertionKind,
        expected: usize,
        actual: usize,
    },
}

/// A precondition that did not hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Unmet {
    pub index: usize,
    pub precondition: Precondition,
    /// Resolved subject value, `None` when the path does not exist.
    pub actual: Option<Value>,
}

/// Read-only `{state, dataStore}` view preconditions are evaluated against.
pub fn snapshot(state: &ExpectedState, data_store: &DataStore) -> Value {
    serde_json::json!({
        "state": state.get_state(),
        "dataStore": data_store.retrieve_all(),
    })
}

/// Resolve a dotted subject path against a snapshot.
///
/// Numeric segments index into arrays. Returns `Ok(None)` when any segment
/// is missing.
pub fn resolve<'a>(snapshot: &'a Value, path: &str) -> Result<Option<&'a Value>, AssertionError> {
    let mut segments = path.split('.');
    let root = segments.next().unwrap_or_default();
    if root != "state" && root != "dataStore" {
        return Err(AssertionError::UnknownRoot {
            path: path.to_string(),
        });
    }
    let mut current = match snapshot.get(root) {
        Some(v) => v,
        None => return Ok(None),
    };
    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Evaluate one precondition. A failed assertion is `Ok(false)`; only a
/// malformed precondition is an error.
pub fn evaluate(precondition: &Precondition, snapshot: &Value) -> Result<bool, AssertionError> {
    let kind = precondition.kind;
    if precondition.expected.len() != kind.arity() {
        return Err(AssertionError::Arity {
            kind,
            expected: kind.arity(),
            actual: precondition.expected.len(),
        });
    }
    let subject = resolve(snapshot, &precondition.subject)?;
    let expected = precondition.expected.first();

    let holds = match kind {
        AssertionKind::Equal | AssertionKind::DeepEqual => subject.is_some() && subject == expected,
        AssertionKind::NotEqual | AssertionKind::NotDeepEqual => {
            subject.is_none() || subject != expected
        }
        AssertionKind::IsTrue => subject == Some(&Value::Bool(true)),
        AssertionKind::IsFalse => subject == Some(&Value::Bool(false)),
        AssertionKind::IsOk => subject.is_some_and(is_truthy),
        AssertionKind::IsNotOk => !subject.is_some_and(is_truthy),
        AssertionKind::IsNull => subject == Some(&Value::Null),
        AssertionKind::IsNotNull => subject != Some(&Value::Null),
        AssertionKind::Exists => subject.is_some_and(|v| !v.is_null()),
        AssertionKind::NotExists => !subject.is_some_and(|v| !v.is_null()),
        AssertionKind::IsAbove => compare(subject, expected, |a, b| a > b),
        AssertionKind::IsAtLeast => compare(subject, expected, |a, b| a >= b),
        AssertionKind::IsBelow => compare(subject, expected, |a, b| a < b),
        AssertionKind::IsAtMost => compare(subject, expected, |a, b| a <= b),
        AssertionKind::LengthOf => match (subject.and_then(length_of), expected.and_then(Value::as_u64)) {
            (Some(len), Some(want)) => len as u64 == want,
            _ => false,
        },
        AssertionKind::Include => includes(subject, expected),
        AssertionKind::NotInclude => subject.is_some() && !includes(subject, expected),
    };
    Ok(holds)
}

/// Evaluate every precondition, returning the ones that do not hold.
///
/// An empty result means the action is applicable.
pub fn check_preconditions(
    preconditions: &[Precondition],
    snapshot: &Value,
) -> Result<Vec<Unmet>, AssertionError> {
    let mut unmet = Vec::new();
    for (index, precondition) in preconditions.iter().enumerate() {
        if !evaluate(precondition, snapshot)? {
            unmet.push(Unmet {
                index,
                precondition: precondition.clone(),
                actual: resolve(snapshot, &precondition.subject)?.cloned(),
            });
        }
    }
    Ok(unmet)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(subject: Option<&Value>, expected: Option<&Value>, cmp: fn(f64, f64) -> bool) -> bool {
    match (subject.and_then(Value::as_f64), expected.and_then(Value::as_f64)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.chars().count()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn includes(subject: Option<&Value>, expected: Option<&Value>) -> bool {
    match (subject, expected) {
        (Some(Value::String(haystack)), Some(Value::String(needle))) => haystack.contains(needle.as_str()),
        (Some(Value::Array(items)), Some(needle)) => items.contains(needle),
        (Some(Value::Object(map)), Some(Value::Object(subset))) => {
            subset.iter().all(|(k, v)| map.get(k) == Some(v))
        }
        _ => false,
    }
}
