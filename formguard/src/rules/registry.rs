//! Registry of named validator definitions.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use super::builtin;
use super::definition::ValidatorDefinition;

/// Shared registry mapping rule names to their definitions.
///
/// The registry is a cheap-to-clone handle: the engine and every field it
/// binds hold the same map, so registering or overwriting a rule changes the
/// behaviour of every field that references that name (last write wins).
/// Lookups happen at evaluation time, so rules may be registered after the
/// fields that use them were bound.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: Arc<RwLock<IndexMap<String, Arc<ValidatorDefinition>>>>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Create a registry pre-populated with the built-in rules.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::register_all(&registry);
        registry
    }

    /// Register a rule, returning the definition it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        definition: ValidatorDefinition,
    ) -> Option<Arc<ValidatorDefinition>> {
        let name = name.into();
        let previous = self.write().insert(name.clone(), Arc::new(definition));
        if previous.is_some() {
            log::debug!("Rule '{}' overwritten", name);
        } else {
            log::trace!("Rule '{}' registered", name);
        }
        previous
    }

    /// Look up a rule by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<ValidatorDefinition>> {
        self.read().get(name).cloned()
    }

    /// Check if a rule is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Remove a rule.
    pub fn unregister(&self, name: &str) -> Option<Arc<ValidatorDefinition>> {
        self.write().shift_remove(name)
    }

    /// Registered rule names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<ValidatorDefinition>>> {
        self.rules.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<ValidatorDefinition>>> {
        self.rules.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
