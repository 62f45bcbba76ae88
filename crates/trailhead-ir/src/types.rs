use std::fmt;

use serde::{Deserialize, Serialize};

// ── Action identifiers ───────────────────────────────────────────────

/// Globally unique key for an action on a component instance:
/// `"<instanceName>.<ACTION_NAME>"`.
///
/// Ordered so that sets and maps keyed by it iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(instance: &str, action: &str) -> Self {
        Self(format!("{instance}.{action}"))
    }

    /// Parse a raw identifier. Returns `None` unless it has the
    /// `instance.ACTION` shape.
    pub fn parse(raw: &str) -> Option<Self> {
        let (instance, action) = raw.split_once('.')?;
        if instance.is_empty() || action.is_empty() {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// Owning component instance name.
    pub fn instance(&self) -> &str {
        self.0.split_once('.').map(|(i, _)| i).unwrap_or(&self.0)
    }

    /// Action name within the owning instance.
    pub fn action(&self) -> &str {
        self.0.split_once('.').map(|(_, a)| a).unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Component registration ───────────────────────────────────────────

/// Arguments for registering a component instance in an expected state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    /// Initial state; must be a JSON object.
    pub state: serde_json::Value,
    #[serde(default = "empty_object")]
    pub options: serde_json::Value,
    /// Dynamic areas this instance belongs to. Children inherit them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_areas: Vec<String>,
    /// When false, declared children are not registered alongside.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub add_children: bool,
}

impl ComponentConfig {
    pub fn new(component_type: &str, name: &str, state: serde_json::Value) -> Self {
        Self {
            component_type: component_type.to_string(),
            name: name.to_string(),
            state,
            options: empty_object(),
            dynamic_areas: Vec::new(),
            add_children: true,
        }
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    pub fn in_dynamic_area(mut self, area: &str) -> Self {
        if !self.dynamic_areas.iter().any(|a| a == area) {
            self.dynamic_areas.push(area.to_string());
        }
        self
    }

    pub fn without_children(mut self) -> Self {
        self.add_children = false;
        self
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_true() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

// ── Test case steps ──────────────────────────────────────────────────

/// Options recorded on a test-case step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOptions {
    #[serde(default)]
    pub parameters: Vec<serde_json::Value>,
}

/// One step of a replayable test case.
///
/// The first step of every plan names the seeded entry component and carries
/// its registration config as its only parameter; every later step names an
/// [`ActionId`] and, when the action takes inputs, the frozen parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<StepOptions>,
}

impl TestStep {
    pub fn entry(config: &ComponentConfig) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: config.name.clone(),
            options: Some(StepOptions {
                parameters: vec![serde_json::to_value(config)?],
            }),
        })
    }

    pub fn action(action: &ActionId, parameters: Option<Vec<serde_json::Value>>) -> Self {
        Self {
            name: action.to_string(),
            options: parameters.map(|parameters| StepOptions { parameters }),
        }
    }

    /// Recover the registration config from an entry step.
    pub fn entry_config(&self) -> Option<ComponentConfig> {
        let value = self.options.as_ref()?.parameters.first()?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn parameters(&self) -> Option<&[serde_json::Value]> {
        self.options.as_ref().map(|o| o.parameters.as_slice())
    }
}
