//! Role definitions.

use crate::permission::{ModuleId, PermissionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A role groups the permissions and modules it grants to the users holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier for the role.
    id: String,
    /// Role name, matched exactly by role checks (`admin`, `super_admin`, ...).
    name: String,
    /// Optional description of the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Permissions granted by this role.
    #[serde(default)]
    permissions: HashSet<PermissionId>,
    /// Modules this role can see.
    #[serde(default)]
    modules: HashSet<ModuleId>,
}

impl Role {
    /// Create a new role with the given name and a generated ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            permissions: HashSet::new(),
            modules: HashSet::new(),
        }
    }

    /// Create a new role with a specific ID.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut role = Self::new(name);
        role.id = id.into();
        role
    }

    /// Get the role's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the role's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the role's description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the role's description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Add a permission to this role.
    pub fn add_permission(mut self, permission: impl Into<PermissionId>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Add multiple permissions to this role.
    pub fn add_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionId>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Grant visibility of a module.
    pub fn add_module(mut self, module: impl Into<ModuleId>) -> Self {
        self.modules.insert(module.into());
        self
    }

    /// Grant visibility of multiple modules.
    pub fn add_modules<I, M>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModuleId>,
    {
        self.modules.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Remove a permission from this role.
    pub fn remove_permission(&mut self, permission: &str) -> bool {
        self.permissions.remove(permission)
    }

    /// Check if this role explicitly grants a permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Check if this role grants a module.
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// Get all permissions granted by this role.
    pub fn permissions(&self) -> &HashSet<PermissionId> {
        &self.permissions
    }

    /// Get all modules granted by this role.
    pub fn modules(&self) -> &HashSet<ModuleId> {
        &self.modules
    }
}
