//! Module registry: which functional areas are currently enabled.
//!
//! Module metadata belongs to the back office, not to the evaluator. The
//! evaluator only asks a registry whether a module is enabled and intersects
//! a user's modules with the answer.

use crate::permission::ModuleId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A functional area of the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Identifier referenced by roles.
    pub id: ModuleId,
    /// Human-readable name.
    pub name: String,
    /// Whether the module is currently available.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Module {
    /// Create an enabled module.
    pub fn new(id: impl Into<ModuleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
        }
    }

    /// Mark the module as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Source of module enablement.
pub trait ModuleRegistry: Send + Sync {
    /// Whether the module is known and enabled.
    fn is_enabled(&self, module: &str) -> bool;
}

/// Registry that treats every module as enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllModulesEnabled;

impl ModuleRegistry for AllModulesEnabled {
    fn is_enabled(&self, _module: &str) -> bool {
        true
    }
}

/// In-memory registry using DashMap for thread safety.
///
/// Clones share the same underlying map, so a registry handed to an
/// evaluator can still be updated by whoever loads module metadata.
#[derive(Debug, Default, Clone)]
pub struct MemoryModuleRegistry {
    modules: Arc<DashMap<ModuleId, Module>>,
}

impl MemoryModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modules: Arc::new(DashMap::new()),
        }
    }

    /// Create a registry pre-populated with modules.
    pub fn with_modules(modules: impl IntoIterator<Item = Module>) -> Self {
        let registry = Self::new();
        for module in modules {
            registry.register(module);
        }
        registry
    }

    /// Register or replace a module.
    pub fn register(&self, module: Module) {
        self.modules.insert(module.id.clone(), module);
    }

    /// Enable or disable a registered module. Returns false when it is unknown.
    pub fn set_enabled(&self, module: &str, enabled: bool) -> bool {
        match self.modules.get_mut(module) {
            Some(mut entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Remove a module.
    pub fn remove(&self, module: &str) -> Option<Module> {
        self.modules.remove(module).map(|(_, module)| module)
    }

    /// Get a copy of a module's metadata.
    pub fn get(&self, module: &str) -> Option<Module> {
        self.modules.get(module).map(|entry| entry.clone())
    }

    /// List all registered modules.
    pub fn list(&self) -> Vec<Module> {
        self.modules.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

impl ModuleRegistry for MemoryModuleRegistry {
    fn is_enabled(&self, module: &str) -> bool {
        self.modules
            .get(module)
            .is_some_and(|entry| entry.enabled)
    }
}

impl<R> ModuleRegistry for Arc<R>
where
    R: ModuleRegistry + ?Sized,
{
    fn is_enabled(&self, module: &str) -> bool {
        (**self).is_enabled(module)
    }
}
