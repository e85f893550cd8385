//! Model registry.
//!
//! Maps model names to compiled model handles. A name is registered at most once;
//! the first registration stays authoritative for the registry's lifetime.

use std::collections::BTreeMap;
use tracing::error;

use crate::error::{DbError, DbResult};
use crate::models::CompiledModel;

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    store: String,
    models: BTreeMap<String, CompiledModel>,
}

impl ModelRegistry {
    /// Create an empty registry for the named store.
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            models: BTreeMap::new(),
        }
    }

    /// Register a compiled model.
    ///
    /// Fails without touching the registry when the name is empty or already taken.
    pub fn add_model(&mut self, model: CompiledModel) -> DbResult<&CompiledModel> {
        if model.name().is_empty() {
            return Err(DbError::invalid_input("Model name cannot be empty"));
        }
        if self.models.contains_key(model.name()) {
            error!(store = %self.store, model = %model.name(), "Model is already added");
            return Err(DbError::duplicate_model(model.name()));
        }
        let name = model.name().to_string();
        Ok(self.models.entry(name).or_insert(model))
    }

    /// Look up a model by name.
    pub fn model(&self, name: &str) -> Option<&CompiledModel> {
        self.models.get(name)
    }

    /// All registered models keyed by name.
    pub fn models(&self) -> &BTreeMap<String, CompiledModel> {
        &self.models
    }

    /// Registered model names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
