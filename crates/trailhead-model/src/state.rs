use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Value};
use trailhead_ir::ComponentConfig;

use crate::catalog::ComponentCatalog;
use crate::component::ComponentInstance;

/// Nesting limit for declared children, guards against self-referencing models.
const MAX_CHILD_DEPTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ExpectedStateError {
    #[error("component type must be a non-empty name without '.' or whitespace, got '{component_type}'")]
    InvalidType { component_type: String },

    #[error("component name must be a non-empty name without '.' or whitespace, got '{name}'")]
    InvalidName { name: String },

    #[error("state for component '{name}' must be an object, got {actual}")]
    StateNotObject { name: String, actual: String },

    #[error("no component model registered for type '{component_type}'")]
    UnknownType { component_type: String },

    #[error("component '{name}' is not registered")]
    UnknownComponent { name: String },

    #[error("children of '{name}' nest deeper than {MAX_CHILD_DEPTH} levels")]
    ChildDepthExceeded { name: String },

    #[error("cannot pop expected state: stash is empty")]
    EmptyStash,
}

/// A stashed copy of the live component set.
#[derive(Debug, Clone, Default)]
struct StashFrame {
    components: BTreeMap<String, ComponentInstance>,
    state: BTreeMap<String, Value>,
    dynamic_areas: BTreeMap<String, BTreeSet<String>>,
}

impl StashFrame {
    fn to_value(&self) -> Value {
        let components: BTreeMap<&str, Value> = self
            .components
            .iter()
            .map(|(name, c)| (name.as_str(), json!([c.component_type(), c.options()])))
            .collect();
        json!({
            "components": components,
            "state": self.state,
            "dynamicAreas": self.dynamic_areas,
        })
    }
}

/// The simulated component-state tree a plan is built against.
///
/// Invariants:
/// - the component map and the state tree have identical key sets;
/// - dynamic-area sets only reference live component names;
/// - `stash` / `pop` are strictly LIFO.
///
/// `clone()` is a deep copy: state values, component options and stash
/// history are all duplicated. Only the immutable models are shared.
#[derive(Debug, Clone)]
pub struct ExpectedState {
    catalog: Arc<ComponentCatalog>,
    live: StashFrame,
    stashed: Vec<StashFrame>,
}

impl ExpectedState {
    pub fn new(catalog: Arc<ComponentCatalog>) -> Self {
        Self {
            catalog,
            live: StashFrame::default(),
            stashed: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<ComponentCatalog> {
        &self.catalog
    }

    /// Instantiate the model for `config.component_type`, register it under
    /// `config.name` with `config.state`, then register its declared children.
    pub fn create_and_add_component(
        &mut self,
        config: ComponentConfig,
    ) -> Result<(), ExpectedStateError> {
        self.add_with_depth(config, 0)
    }

    fn add_with_depth(
        &mut self,
        config: ComponentConfig,
        depth: usize,
    ) -> Result<(), ExpectedStateError> {
        if !is_well_formed(&config.component_type) {
            return Err(ExpectedStateError::InvalidType {
                component_type: config.component_type,
            });
        }
        if !is_well_formed(&config.name) {
            return Err(ExpectedStateError::InvalidName { name: config.name });
        }
        if !config.state.is_object() {
            return Err(ExpectedStateError::StateNotObject {
                name: config.name,
                actual: config.state.to_string(),
            });
        }
        if depth > MAX_CHILD_DEPTH {
            return Err(ExpectedStateError::ChildDepthExceeded { name: config.name });
        }

        let model = self
            .catalog
            .get(&config.component_type)
            .cloned()
            .ok_or_else(|| ExpectedStateError::UnknownType {
                component_type: config.component_type.clone(),
            })?;

        let instance = ComponentInstance::new(model.clone(), &config.name, config.options);
        let children = if config.add_children {
            model.children(&instance)
        } else {
            Vec::new()
        };

        self.insert(instance, config.state, &config.dynamic_areas);

        for mut child in children {
            for area in &config.dynamic_areas {
                child = child.in_dynamic_area(area);
            }
            self.add_with_depth(child, depth + 1)?;
        }

        Ok(())
    }

    fn insert(&mut self, instance: ComponentInstance, state: Value, areas: &[String]) {
        let name = instance.name().to_string();
        if self.live.components.contains_key(&name) {
            self.remove(&name);
        }
        for area in areas {
            self.live
                .dynamic_areas
                .entry(area.clone())
                .or_default()
                .insert(name.clone());
        }
        self.live.state.insert(name.clone(), state);
        self.live.components.insert(name, instance);
    }

    fn remove(&mut self, name: &str) -> bool {
        let existed = self.live.components.remove(name).is_some();
        self.live.state.remove(name);
        self.live.dynamic_areas.retain(|_, members| {
            members.remove(name);
            !members.is_empty()
        });
        existed
    }

    /// Unregister one component instance.
    pub fn delete(&mut self, name: &str) -> Result<(), ExpectedStateError> {
        if self.remove(name) {
            Ok(())
        } else {
            Err(ExpectedStateError::UnknownComponent {
                name: name.to_string(),
            })
        }
    }

    /// Unregister every live component. The stash is untouched.
    pub fn delete_all(&mut self) {
        self.live = StashFrame::default();
    }

    /// Remove every component registered under a dynamic area.
    pub fn clear_dynamic_area(&mut self, area: &str) {
        if let Some(members) = self.live.dynamic_areas.remove(area) {
            for name in members {
                self.remove(&name);
            }
        }
    }

    pub fn components_in_dynamic_area(&self, area: &str) -> Vec<&str> {
        self.live
            .dynamic_areas
            .get(area)
            .map(|members| members.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Push the entire live component set onto the stash, leaving it empty.
    pub fn stash(&mut self) {
        let frame = std::mem::take(&mut self.live);
        self.stashed.push(frame);
    }

    /// Restore the most recently stashed component set, discarding the live one.
    pub fn pop(&mut self) -> Result<(), ExpectedStateError> {
        let frame = self.stashed.pop().ok_or(ExpectedStateError::EmptyStash)?;
        self.live = frame;
        Ok(())
    }

    pub fn stash_depth(&self) -> usize {
        self.stashed.len()
    }

    /// Canonical text of the live frame and every stashed frame.
    ///
    /// Two states with equal fingerprints expose the same actions and
    /// react identically to every effect.
    pub fn fingerprint(&self) -> String {
        let frames: Vec<Value> = std::iter::once(&self.live)
            .chain(self.stashed.iter().rev())
            .map(StashFrame::to_value)
            .collect();
        Value::Array(frames).to_string()
    }

    pub fn get_components(&self) -> Vec<&ComponentInstance> {
        self.live.components.values().collect()
    }

    pub fn get_components_as_map(&self) -> &BTreeMap<String, ComponentInstance> {
        &self.live.components
    }

    pub fn retrieve_component(&self, name: &str) -> Option<&ComponentInstance> {
        self.live.components.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.live.components.contains_key(name)
    }

    /// The whole state tree as a JSON object keyed by instance name.
    pub fn get_state(&self) -> Value {
        Value::Object(
            self.live
                .state
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn state_of(&self, name: &str) -> Option<&Value> {
        self.live.state.get(name)
    }

    /// Replace the state of a registered component.
    pub fn set_state(&mut self, name: &str, state: Value) -> Result<(), ExpectedStateError> {
        if !state.is_object() {
            return Err(ExpectedStateError::StateNotObject {
                name: name.to_string(),
                actual: state.to_string(),
            });
        }
        let slot = self
            .live
            .state
            .get_mut(name)
            .ok_or_else(|| ExpectedStateError::UnknownComponent {
                name: name.to_string(),
            })?;
        *slot = state;
        Ok(())
    }

    /// Mutate the state of a registered component in place.
    pub fn modify<F>(&mut self, name: &str, f: F) -> Result<(), ExpectedStateError>
    where
        F: FnOnce(&mut Value),
    {
        let slot = self
            .live
            .state
            .get_mut(name)
            .ok_or_else(|| ExpectedStateError::UnknownComponent {
                name: name.to_string(),
            })?;
        f(slot);
        Ok(())
    }

    /// Check the component-map / state-tree / dynamic-area invariants.
    pub fn is_consistent(&self) -> bool {
        let frames = std::iter::once(&self.live).chain(self.stashed.iter());
        for frame in frames {
            if !frame.components.keys().eq(frame.state.keys()) {
                return false;
            }
            let dangling = frame
                .dynamic_areas
                .values()
                .flatten()
                .any(|name| !frame.components.contains_key(name));
            if dangling {
                return false;
            }
        }
        true
    }
}

fn is_well_formed(name: &str) -> bool {
    !name.is_empty() && !name.contains('.') && !name.chars().any(char::is_whitespace)
}
