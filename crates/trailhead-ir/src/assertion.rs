use std::fmt;

use serde::{Deserialize, Serialize};

/// Assertion kinds understood by the precondition evaluator.
///
/// Names follow the usual assert-style vocabulary (`isTrue`, `deepEqual`, ...)
/// so model authors can write preconditions as plain JSON tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertionKind {
    Equal,
    NotEqual,
    DeepEqual,
    NotDeepEqual,
    IsTrue,
    IsFalse,
    IsOk,
    IsNotOk,
    IsNull,
    IsNotNull,
    Exists,
    NotExists,
    IsAbove,
    IsAtLeast,
    IsBelow,
    IsAtMost,
    LengthOf,
    Include,
    NotInclude,
}

impl AssertionKind {
    /// Number of expected arguments following the subject path.
    pub fn arity(self) -> usize {
        match self {
            AssertionKind::IsTrue
            | AssertionKind::IsFalse
            | AssertionKind::IsOk
            | AssertionKind::IsNotOk
            | AssertionKind::IsNull
            | AssertionKind::IsNotNull
            | AssertionKind::Exists
            | AssertionKind::NotExists => 0,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AssertionKind::Equal => "equal",
            AssertionKind::NotEqual => "notEqual",
            AssertionKind::DeepEqual => "deepEqual",
            AssertionKind::NotDeepEqual => "notDeepEqual",
            AssertionKind::IsTrue => "isTrue",
            AssertionKind::IsFalse => "isFalse",
            AssertionKind::IsOk => "isOk",
            AssertionKind::IsNotOk => "isNotOk",
            AssertionKind::IsNull => "isNull",
            AssertionKind::IsNotNull => "isNotNull",
            AssertionKind::Exists => "exists",
            AssertionKind::NotExists => "notExists",
            AssertionKind::IsAbove => "isAbove",
            AssertionKind::IsAtLeast => "isAtLeast",
            AssertionKind::IsBelow => "isBelow",
            AssertionKind::IsAtMost => "isAtMost",
            AssertionKind::LengthOf => "lengthOf",
            AssertionKind::Include => "include",
            AssertionKind::NotInclude => "notInclude",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "equal" => AssertionKind::Equal,
            "notEqual" => AssertionKind::NotEqual,
            "deepEqual" => AssertionKind::DeepEqual,
            "notDeepEqual" => AssertionKind::NotDeepEqual,
            "isTrue" => AssertionKind::IsTrue,
            "isFalse" => AssertionKind::IsFalse,
            "isOk" => AssertionKind::IsOk,
            "isNotOk" => AssertionKind::IsNotOk,
            "isNull" => AssertionKind::IsNull,
            "isNotNull" => AssertionKind::IsNotNull,
            "exists" => AssertionKind::Exists,
            "notExists" => AssertionKind::NotExists,
            "isAbove" => AssertionKind::IsAbove,
            "isAtLeast" => AssertionKind::IsAtLeast,
            "isBelow" => AssertionKind::IsBelow,
            "isAtMost" => AssertionKind::IsAtMost,
            "lengthOf" => AssertionKind::LengthOf,
            "include" => AssertionKind::Include,
            "notInclude" => AssertionKind::NotInclude,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A precondition tuple: `[kind, subjectPath, ...expected]`.
///
/// `subject` is a dotted path rooted at `state` or `dataStore`, e.g.
/// `state.login.loggedIn`.
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub kind: AssertionKind,
    pub subject: String,
    pub expected: Vec<serde_json::Value>,
}

impl Precondition {
    pub fn new(kind: AssertionKind, subject: &str) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            expected: Vec::new(),
        }
    }

    pub fn with_expected(kind: AssertionKind, subject: &str, expected: serde_json::Value) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            expected: vec![expected],
        }
    }

    pub fn is_true(subject: &str) -> Self {
        Self::new(AssertionKind::IsTrue, subject)
    }

    pub fn is_false(subject: &str) -> Self {
        Self::new(AssertionKind::IsFalse, subject)
    }

    pub fn equal(subject: &str, expected: serde_json::Value) -> Self {
        Self::with_expected(AssertionKind::Equal, subject, expected)
    }

    pub fn exists(subject: &str) -> Self {
        Self::new(AssertionKind::Exists, subject)
    }

    pub fn not_exists(subject: &str) -> Self {
        Self::new(AssertionKind::NotExists, subject)
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}", self.kind, self.subject)?;
        for value in &self.expected {
            write!(f, ", {value}")?;
        }
        f.write_str("]")
    }
}

impl Serialize for Precondition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tuple = Vec::with_capacity(self.expected.len() + 2);
        tuple.push(serde_json::Value::String(self.kind.name().to_string()));
        tuple.push(serde_json::Value::String(self.subject.clone()));
        tuple.extend(self.expected.iter().cloned());
        tuple.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Precondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_precondition(&value).map_err(serde::de::Error::custom)
    }
}

fn parse_precondition(value: &serde_json::Value) -> Result<Precondition, String> {
    let arr = value
        .as_array()
        .ok_or_else(|| format!("precondition must be an array, got: {value}"))?;
    if arr.len() < 2 {
        return Err(format!(
            "precondition requires at least 2 elements, got {}",
            arr.len()
        ));
    }

    let tag = arr[0]
        .as_str()
        .ok_or_else(|| format!("assertion kind must be a string, got: {:?}", arr[0]))?;
    let kind = AssertionKind::from_name(tag).ok_or_else(|| format!("unknown assertion kind: {tag}"))?;
    let subject = arr[1]
        .as_str()
        .ok_or("precondition subject must be a string path")?
        .to_string();

    let expected: Vec<serde_json::Value> = arr[2..].to_vec();
    if expected.len() != kind.arity() {
        return Err(format!(
            "{tag} expects {} argument(s) after the subject, got {}",
            kind.arity(),
            expected.len()
        ));
    }

    Ok(Precondition {
        kind,
        subject,
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_unary_assertion() {
        let p: Precondition = serde_json::from_value(json!(["isTrue", "state.login.loggedIn"])).unwrap();
        assert_eq!(p.kind, AssertionKind::IsTrue);
        assert_eq!(p.subject, "state.login.loggedIn");
        assert!(p.expected.is_empty());
    }

    #[test]
    fn test_parse_binary_assertion() {
        let p: Precondition =
            serde_json::from_value(json!(["lengthOf", "dataStore.cart", 3])).unwrap();
        assert_eq!(p.kind, AssertionKind::LengthOf);
        assert_eq!(p.expected, vec![json!(3)]);
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let err = serde_json::from_value::<Precondition>(json!(["isTrue", "state.a", true])).unwrap_err();
        assert!(err.to_string().contains("isTrue expects 0"));
        assert!(serde_json::from_value::<Precondition>(json!(["equal", "state.a"])).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = serde_json::from_value::<Precondition>(json!(["isPurple", "state.a"])).unwrap_err();
        assert!(err.to_string().contains("unknown assertion kind"));
    }

    #[test]
    fn test_serialize_as_tuple() {
        let p = Precondition::equal("state.login.user", json!("admin"));
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!(["equal", "state.login.user", "admin"])
        );
    }
}
