//! Access evaluator.
//!
//! Answers authorization queries for the currently loaded user from in-memory
//! role data only. Loading a user derives, once, the union of permissions and
//! modules across all of the user's roles; every query afterwards is a set
//! lookup.
//!
//! # Super-admin bypass
//!
//! A user holding the super-admin role implicitly holds every permission.
//! The rule lives in one private helper that every permission and module
//! query goes through, and is evaluated before explicit membership.
//!
//! # States
//!
//! The evaluator is either *not loaded* (no user, or a user whose role list
//! is still pending or empty) or *loaded* (derived sets computed from at least
//! one role). Every permission and module query answers `false` while not
//! loaded. Loading a new user replaces the previous
//! derivation atomically.

#[cfg(feature = "audit")]
use log::{debug, info};

use crate::{
    config::EvaluatorConfig,
    permission::{ModuleId, PermissionId},
    registry::{AllModulesEnabled, ModuleRegistry},
    user::User,
};
use std::collections::HashSet;

/// Observable load state of an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No user, or the user's roles are still pending.
    NotLoaded,
    /// Permission and module sets have been derived.
    Loaded,
}

/// Sets derived from a user's roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedAccess {
    /// Union of permissions across all roles.
    pub permissions: HashSet<PermissionId>,
    /// Union of modules across all roles.
    pub modules: HashSet<ModuleId>,
    /// `modules` restricted to the ones the registry reports as enabled.
    pub accessible_modules: HashSet<ModuleId>,
}

impl DerivedAccess {
    /// Derive the permission and module unions for a user.
    pub fn derive(user: &User, registry: &impl ModuleRegistry) -> Self {
        let mut derived = Self::default();
        for role in user.roles() {
            derived
                .permissions
                .extend(role.permissions().iter().cloned());
            derived.modules.extend(role.modules().iter().cloned());
        }
        derived.refresh_accessible(registry);
        derived
    }

    fn refresh_accessible(&mut self, registry: &impl ModuleRegistry) {
        self.accessible_modules = self
            .modules
            .iter()
            .filter(|module| registry.is_enabled(module.as_str()))
            .cloned()
            .collect();
    }
}

/// Authorization evaluator for one user session.
#[derive(Debug)]
pub struct AccessEvaluator<R = AllModulesEnabled>
where
    R: ModuleRegistry,
{
    registry: R,
    config: EvaluatorConfig,
    user: Option<User>,
    derived: Option<DerivedAccess>,
}

impl AccessEvaluator<AllModulesEnabled> {
    /// Create an evaluator that treats every module as enabled.
    pub fn new() -> Self {
        Self::with_registry(AllModulesEnabled)
    }
}

impl Default for AccessEvaluator<AllModulesEnabled> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> AccessEvaluator<R>
where
    R: ModuleRegistry,
{
    /// Create an evaluator backed by a module registry.
    pub fn with_registry(registry: R) -> Self {
        Self::with_config(registry, EvaluatorConfig::default())
    }

    /// Create an evaluator with custom role names.
    pub fn with_config(registry: R, config: EvaluatorConfig) -> Self {
        Self {
            registry,
            config,
            user: None,
            derived: None,
        }
    }

    /// Load (or replace) the session user and derive their access sets.
    ///
    /// A user whose role list is pending or empty leaves the evaluator not
    /// loaded.
    pub fn load_user(&mut self, user: User) -> LoadState {
        self.derived = (!user.roles().is_empty())
            .then(|| DerivedAccess::derive(&user, &self.registry));

        #[cfg(feature = "audit")]
        {
            match &self.derived {
                Some(derived) => info!(
                    "Permissions loaded for user '{}': {} permissions, {} modules",
                    user.id(),
                    derived.permissions.len(),
                    derived.modules.len()
                ),
                None => debug!("User '{}' loaded without roles", user.id()),
            }
        }

        self.user = Some(user);
        self.state()
    }

    /// Drop the session user (sign-out).
    pub fn unload(&mut self) {
        self.user = None;
        self.derived = None;
    }

    /// Recompute accessible modules after the registry changed.
    pub fn refresh_modules(&mut self) {
        if let Some(derived) = self.derived.as_mut() {
            derived.refresh_accessible(&self.registry);
        }
    }

    pub fn state(&self) -> LoadState {
        if self.derived.is_some() {
            LoadState::Loaded
        } else {
            LoadState::NotLoaded
        }
    }

    /// Whether permission sets have been derived for the current user.
    pub fn permissions_loaded(&self) -> bool {
        self.derived.is_some()
    }

    /// The loaded user, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Derived permissions; empty while not loaded.
    pub fn permissions(&self) -> HashSet<PermissionId> {
        self.derived
            .as_ref()
            .map(|derived| derived.permissions.clone())
            .unwrap_or_default()
    }

    /// Derived modules; empty while not loaded.
    pub fn modules(&self) -> HashSet<ModuleId> {
        self.derived
            .as_ref()
            .map(|derived| derived.modules.clone())
            .unwrap_or_default()
    }

    /// Derived modules that are currently enabled; empty while not loaded.
    ///
    /// Modules disabled since the last derivation are filtered out here.
    /// Newly enabled ones appear after [`refresh_modules`](Self::refresh_modules).
    pub fn accessible_modules(&self) -> HashSet<ModuleId> {
        self.derived
            .as_ref()
            .map(|derived| {
                derived
                    .accessible_modules
                    .iter()
                    .filter(|module| self.registry.is_enabled(module.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if the user holds a permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.grants(|derived| derived.permissions.contains(permission))
    }

    /// Check if the user holds at least one of the permissions.
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.grants(|derived| {
            permissions
                .iter()
                .any(|permission| derived.permissions.contains(permission.as_ref()))
        })
    }

    /// Check if the user holds every one of the permissions.
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.grants(|derived| {
            permissions
                .iter()
                .all(|permission| derived.permissions.contains(permission.as_ref()))
        })
    }

    /// Check if the user can see a module.
    ///
    /// The super-admin bypass skips role membership but not the registry: a
    /// disabled module stays hidden for everyone.
    pub fn has_module_access(&self, module: &str) -> bool {
        self.registry.is_enabled(module)
            && self.grants(|derived| derived.accessible_modules.contains(module))
    }

    /// Check if the user holds a role with exactly this name.
    pub fn has_role(&self, role_name: &str) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.roles().iter().any(|role| role.name() == role_name))
    }

    /// Check if the user holds at least one of the roles.
    pub fn has_any_role<S: AsRef<str>>(&self, role_names: &[S]) -> bool {
        role_names
            .iter()
            .any(|role_name| self.has_role(role_name.as_ref()))
    }

    /// Admin status: the admin role, or super-admin.
    pub fn is_admin(&self) -> bool {
        self.has_role(&self.config.admin_role) || self.is_super_admin()
    }

    /// Super-admin status: the super-admin role.
    pub fn is_super_admin(&self) -> bool {
        self.has_role(&self.config.super_admin_role)
    }

    /// Display name of the loaded user; empty when there is none.
    pub fn user_name(&self) -> String {
        self.user
            .as_ref()
            .map(User::display_name)
            .unwrap_or_default()
    }

    /// Initials of the loaded user; the placeholder when there is none.
    pub fn user_initials(&self) -> String {
        self.user
            .as_ref()
            .map(User::initials)
            .unwrap_or_else(|| crate::user::PLACEHOLDER_INITIALS.to_string())
    }

    /// Every permission-style query goes through here.
    fn grants(&self, explicit: impl FnOnce(&DerivedAccess) -> bool) -> bool {
        let Some(derived) = self.derived.as_ref() else {
            return false;
        };
        self.is_super_admin() || explicit(derived)
    }
}
