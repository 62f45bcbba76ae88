use std::sync::Arc;

use serde_json::json;
use trailhead_ir::{AssertionKind, ComponentConfig, Precondition};
use trailhead_model::eval::{check_preconditions, evaluate, resolve, snapshot, AssertionError};
use trailhead_model::{ComponentCatalog, DataStore, DeclaredComponent, ExpectedState};

fn setup() -> serde_json::Value {
    let catalog = Arc::new(ComponentCatalog::new().with(DeclaredComponent::new("Login")));
    let mut state = ExpectedState::new(catalog);
    state
        .create_and_add_component(ComponentConfig::new(
            "Login",
            "login",
            json!({ "loggedIn": false, "attempts": 2, "user": null, "roles": ["viewer"], "banner": "Welcome back" }),
        ))
        .unwrap();
    let mut store = DataStore::new();
    store.store("cart", json!([{ "sku": "a" }, { "sku": "b" }]));
    snapshot(&state, &store)
}

fn holds(kind: AssertionKind, subject: &str, expected: Option<serde_json::Value>) -> bool {
    let precondition = match expected {
        Some(v) => Precondition::with_expected(kind, subject, v),
        None => Precondition::new(kind, subject),
    };
    evaluate(&precondition, &setup()).unwrap()
}

#[test]
fn test_resolve_nested_paths() {
    let snap = setup();
    assert_eq!(resolve(&snap, "state.login.attempts").unwrap(), Some(&json!(2)));
    assert_eq!(resolve(&snap, "dataStore.cart.1.sku").unwrap(), Some(&json!("b")));
    assert_eq!(resolve(&snap, "state.login.missing").unwrap(), None);
    assert!(matches!(
        resolve(&snap, "page.login"),
        Err(AssertionError::UnknownRoot { .. })
    ));
}

#[test]
fn test_boolean_assertions() {
    assert!(holds(AssertionKind::IsFalse, "state.login.loggedIn", None));
    assert!(!holds(AssertionKind::IsTrue, "state.login.loggedIn", None));
    assert!(!holds(AssertionKind::IsTrue, "state.login.missing", None));
    assert!(holds(AssertionKind::IsOk, "state.login.attempts", None));
    assert!(holds(AssertionKind::IsNotOk, "state.login.user", None));
    assert!(holds(AssertionKind::IsNotOk, "state.login.missing", None));
}

#[test]
fn test_existence_and_null_assertions() {
    assert!(holds(AssertionKind::IsNull, "state.login.user", None));
    assert!(!holds(AssertionKind::IsNull, "state.login.missing", None));
    assert!(holds(AssertionKind::NotExists, "state.login.user", None));
    assert!(holds(AssertionKind::Exists, "state.login.roles", None));
}

#[test]
fn test_equality_assertions() {
    assert!(holds(AssertionKind::Equal, "state.login.attempts", Some(json!(2))));
    assert!(holds(AssertionKind::DeepEqual, "state.login.roles", Some(json!(["viewer"]))));
    assert!(holds(AssertionKind::NotEqual, "state.login.attempts", Some(json!(3))));
    assert!(!holds(AssertionKind::Equal, "state.login.missing", Some(json!(null))));
}

#[test]
fn test_numeric_comparisons() {
    assert!(holds(AssertionKind::IsAbove, "state.login.attempts", Some(json!(1))));
    assert!(holds(AssertionKind::IsAtMost, "state.login.attempts", Some(json!(2))));
    assert!(!holds(AssertionKind::IsBelow, "state.login.attempts", Some(json!(2))));
    assert!(!holds(AssertionKind::IsAbove, "state.login.banner", Some(json!(1))));
}

#[test]
fn test_collection_assertions() {
    assert!(holds(AssertionKind::LengthOf, "dataStore.cart", Some(json!(2))));
    assert!(holds(AssertionKind::Include, "state.login.banner", Some(json!("Welcome"))));
    assert!(holds(AssertionKind::Include, "state.login.roles", Some(json!("viewer"))));
    assert!(holds(AssertionKind::Include, "dataStore.cart.0", Some(json!({ "sku": "a" }))));
    assert!(holds(AssertionKind::NotInclude, "state.login.roles", Some(json!("admin"))));
}

#[test]
fn test_check_preconditions_reports_unmet() {
    let snap = setup();
    let preconditions = vec![
        Precondition::is_false("state.login.loggedIn"),
        Precondition::equal("state.login.attempts", json!(5)),
    ];
    let unmet = check_preconditions(&preconditions, &snap).unwrap();
    assert_eq!(unmet.len(), 1);
    assert_eq!(unmet[0].index, 1);
    assert_eq!(unmet[0].actual, Some(json!(2)));
}

#[test]
fn test_malformed_precondition_is_an_error() {
    let bad = Precondition {
        kind: AssertionKind::Equal,
        subject: "state.login.attempts".to_string(),
        expected: vec![],
    };
    assert!(matches!(
        evaluate(&bad, &setup()),
        Err(AssertionError::Arity { expected: 1, actual: 0, .. })
    ));
}
