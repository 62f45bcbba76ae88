use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use trailhead_ir::ComponentConfig;

use crate::component::ComponentModel;

/// Registry of component models keyed by component type.
#[derive(Clone, Default)]
pub struct ComponentCatalog {
    models: BTreeMap<String, Arc<dyn ComponentModel>>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any previous model of the same type.
    pub fn register<M: ComponentModel + 'static>(&mut self, model: M) -> &mut Self {
        self.register_arc(Arc::new(model))
    }

    pub fn register_arc(&mut self, model: Arc<dyn ComponentModel>) -> &mut Self {
        self.models.insert(model.component_type().to_string(), model);
        self
    }

    pub fn with<M: ComponentModel + 'static>(mut self, model: M) -> Self {
        self.register(model);
        self
    }

    pub fn get(&self, component_type: &str) -> Option<&Arc<dyn ComponentModel>> {
        self.models.get(component_type)
    }

    pub fn component_types(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Registration configs for every model that declares an entry point,
    /// ordered by component type.
    pub fn entry_points(&self) -> Vec<ComponentConfig> {
        self.models
            .iter()
            .filter_map(|(ty, model)| model.entry_component().map(|e| e.to_config(ty)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCatalog")
            .field("types", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::DeclaredComponent;
    use serde_json::json;

    #[test]
    fn test_entry_points_only_for_declared_entries() {
        let catalog = ComponentCatalog::new()
            .with(DeclaredComponent::new("Modal"))
            .with(DeclaredComponent::new("Login").with_entry(
                "login",
                json!({ "loggedIn": false }),
                json!({}),
            ));
        let entries = catalog.entry_points();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].component_type, "Login");
        assert_eq!(entries[0].name, "login");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_register_replaces_same_type() {
        let mut catalog = ComponentCatalog::new();
        catalog.register(DeclaredComponent::new("Login"));
        catalog.register(DeclaredComponent::new("Login").with_entry("login", json!({}), json!({})));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entry_points().len(), 1);
    }
}
