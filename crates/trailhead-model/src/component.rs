use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trailhead_ir::{ActionId, ComponentConfig, Precondition};

use crate::state::{ExpectedState, ExpectedStateError};
use crate::store::DataStore;

/// Error raised by authored precondition, parameter or effect functions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Message(String),

    #[error("missing parameter at index {index}")]
    MissingParameter { index: usize },

    #[error(transparent)]
    ExpectedState(#[from] ExpectedStateError),
}

impl ActionError {
    pub fn msg(message: impl Into<String>) -> Self {
        ActionError::Message(message.into())
    }
}

/// Fetch a positional parameter inside an authored function.
pub fn param(parameters: &[Value], index: usize) -> Result<&Value, ActionError> {
    parameters
        .get(index)
        .ok_or(ActionError::MissingParameter { index })
}

pub type PreconditionsFn = Arc<
    dyn Fn(&ComponentInstance, &[Value], &mut DataStore) -> Result<Vec<Precondition>, ActionError>
        + Send
        + Sync,
>;

pub type EffectsFn = Arc<
    dyn Fn(&ComponentInstance, &[Value], &mut ExpectedState, &mut DataStore) -> Result<(), ActionError>
        + Send
        + Sync,
>;

pub type ChildrenFn = Arc<dyn Fn(&ComponentInstance) -> Vec<ComponentConfig> + Send + Sync>;

/// Produces one input value for an action, reading or writing the data store.
pub trait ParamGenerator: Send + Sync {
    fn generate(
        &self,
        component: &ComponentInstance,
        data_store: &mut DataStore,
    ) -> Result<Value, ActionError>;
}

impl<F> ParamGenerator for F
where
    F: Fn(&ComponentInstance, &mut DataStore) -> Result<Value, ActionError> + Send + Sync,
{
    fn generate(
        &self,
        component: &ComponentInstance,
        data_store: &mut DataStore,
    ) -> Result<Value, ActionError> {
        self(component, data_store)
    }
}

/// One named action on a component model.
#[derive(Clone)]
pub struct ActionDef {
    preconditions: Option<PreconditionsFn>,
    parameters: Vec<Arc<dyn ParamGenerator>>,
    effects: EffectsFn,
}

impl ActionDef {
    pub fn new<F>(effects: F) -> Self
    where
        F: Fn(&ComponentInstance, &[Value], &mut ExpectedState, &mut DataStore) -> Result<(), ActionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            preconditions: None,
            parameters: Vec::new(),
            effects: Arc::new(effects),
        }
    }

    pub fn with_preconditions<F>(mut self, preconditions: F) -> Self
    where
        F: Fn(&ComponentInstance, &[Value], &mut DataStore) -> Result<Vec<Precondition>, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.preconditions = Some(Arc::new(preconditions));
        self
    }

    pub fn with_parameter<F>(self, generate: F) -> Self
    where
        F: Fn(&ComponentInstance, &mut DataStore) -> Result<Value, ActionError> + Send + Sync + 'static,
    {
        self.with_generator(generate)
    }

    pub fn with_generator<G: ParamGenerator + 'static>(mut self, generator: G) -> Self {
        self.parameters.push(Arc::new(generator));
        self
    }

    pub fn has_preconditions(&self) -> bool {
        self.preconditions.is_some()
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// Run every parameter generator in declaration order.
    pub fn generate_parameters(
        &self,
        component: &ComponentInstance,
        data_store: &mut DataStore,
    ) -> Result<Vec<Value>, ActionError> {
        self.parameters
            .iter()
            .map(|generator| generator.generate(component, data_store))
            .collect()
    }

    /// Precondition tuples for the given inputs. Empty when none are declared.
    pub fn preconditions(
        &self,
        component: &ComponentInstance,
        parameters: &[Value],
        data_store: &mut DataStore,
    ) -> Result<Vec<Precondition>, ActionError> {
        match &self.preconditions {
            Some(f) => f(component, parameters, data_store),
            None => Ok(Vec::new()),
        }
    }

    pub fn effects(
        &self,
        component: &ComponentInstance,
        parameters: &[Value],
        state: &mut ExpectedState,
        data_store: &mut DataStore,
    ) -> Result<(), ActionError> {
        (self.effects)(component, parameters, state, data_store)
    }
}

impl fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDef")
            .field("preconditions", &self.preconditions.is_some())
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

pub type ActionTable = BTreeMap<String, ActionDef>;

/// Where a component model can seed a plan from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryComponent {
    pub name: String,
    pub state: Value,
    #[serde(default)]
    pub options: Value,
}

impl EntryComponent {
    pub fn to_config(&self, component_type: &str) -> ComponentConfig {
        let options = if self.options.is_null() {
            Value::Object(Default::default())
        } else {
            self.options.clone()
        };
        ComponentConfig::new(component_type, &self.name, self.state.clone()).with_options(options)
    }
}

/// A Component Action Model: the authored description of one component type.
pub trait ComponentModel: Send + Sync {
    fn component_type(&self) -> &str;

    fn entry_component(&self) -> Option<EntryComponent> {
        None
    }

    fn actions(&self) -> &ActionTable;

    /// Child components registered alongside an instance of this type.
    fn children(&self, _instance: &ComponentInstance) -> Vec<ComponentConfig> {
        Vec::new()
    }
}

/// A registered component: a model bound to an instance name and options.
///
/// Cloning yields a fresh instance with copied options; the model itself is
/// immutable and shared.
#[derive(Clone)]
pub struct ComponentInstance {
    component_type: String,
    name: String,
    options: Value,
    model: Arc<dyn ComponentModel>,
}

impl ComponentInstance {
    pub fn new(model: Arc<dyn ComponentModel>, name: &str, options: Value) -> Self {
        Self {
            component_type: model.component_type().to_string(),
            name: name.to_string(),
            options,
            model,
        }
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn model(&self) -> &Arc<dyn ComponentModel> {
        &self.model
    }

    pub fn actions(&self) -> &ActionTable {
        self.model.actions()
    }

    pub fn action(&self, action_name: &str) -> Option<&ActionDef> {
        self.model.actions().get(action_name)
    }

    pub fn action_id(&self, action_name: &str) -> ActionId {
        ActionId::new(&self.name, action_name)
    }

    /// Identifiers of every action this instance exposes, in name order.
    pub fn action_ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.actions().keys().map(|a| self.action_id(a))
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("type", &self.component_type)
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

/// Builder-style [`ComponentModel`] for models authored in Rust.
#[derive(Clone)]
pub struct DeclaredComponent {
    component_type: String,
    entry: Option<EntryComponent>,
    actions: ActionTable,
    children: Option<ChildrenFn>,
}

impl DeclaredComponent {
    pub fn new(component_type: &str) -> Self {
        Self {
            component_type: component_type.to_string(),
            entry: None,
            actions: ActionTable::new(),
            children: None,
        }
    }

    pub fn with_entry(mut self, name: &str, state: Value, options: Value) -> Self {
        self.entry = Some(EntryComponent {
            name: name.to_string(),
            state,
            options,
        });
        self
    }

    pub fn with_action(mut self, name: &str, action: ActionDef) -> Self {
        self.actions.insert(name.to_string(), action);
        self
    }

    pub fn with_children<F>(mut self, children: F) -> Self
    where
        F: Fn(&ComponentInstance) -> Vec<ComponentConfig> + Send + Sync + 'static,
    {
        self.children = Some(Arc::new(children));
        self
    }
}

impl ComponentModel for DeclaredComponent {
    fn component_type(&self) -> &str {
        &self.component_type
    }

    fn entry_component(&self) -> Option<EntryComponent> {
        self.entry.clone()
    }

    fn actions(&self) -> &ActionTable {
        &self.actions
    }

    fn children(&self, instance: &ComponentInstance) -> Vec<ComponentConfig> {
        match &self.children {
            Some(f) => f(instance),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for DeclaredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredComponent")
            .field("type", &self.component_type)
            .field("entry", &self.entry)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
