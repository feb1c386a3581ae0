//! Declarative access requirements for protected regions.
//!
//! A protected region (page, panel, action button) states what it needs as an
//! [`AccessRequirement`]; the evaluator turns that into an [`AccessResult`]
//! which tells the caller to render, render a fallback, or wait for the
//! user's permissions to load.

use crate::{
    evaluator::AccessEvaluator,
    permission::{ModuleId, PermissionId},
    registry::ModuleRegistry,
};

/// The result of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessResult {
    /// Access is granted.
    Granted,
    /// Access is denied with a reason.
    Denied(String),
    /// Permissions are not loaded yet; no decision can be made.
    Pending,
}

impl AccessResult {
    /// Returns true if access was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessResult::Granted)
    }

    /// Returns true if access was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessResult::Denied(_))
    }

    /// Returns true if the decision is waiting on permissions.
    pub fn is_pending(&self) -> bool {
        matches!(self, AccessResult::Pending)
    }

    /// Returns the denial reason if access was denied.
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            AccessResult::Denied(reason) => Some(reason),
            AccessResult::Granted | AccessResult::Pending => None,
        }
    }
}

impl From<bool> for AccessResult {
    fn from(granted: bool) -> Self {
        if granted {
            AccessResult::Granted
        } else {
            AccessResult::Denied("Access denied".to_string())
        }
    }
}

/// What a protected region requires. All listed conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequirement {
    permissions: Vec<PermissionId>,
    roles: Vec<String>,
    any_roles: Vec<String>,
    modules: Vec<ModuleId>,
    admin: bool,
    super_admin: bool,
}

impl AccessRequirement {
    /// A requirement with no conditions; granted to any loaded user.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a permission.
    pub fn permission(mut self, permission: impl Into<PermissionId>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Require a role.
    pub fn role(mut self, role_name: impl Into<String>) -> Self {
        self.roles.push(role_name.into());
        self
    }

    /// Require at least one of the roles.
    pub fn any_role<I, S>(mut self, role_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.any_roles
            .extend(role_names.into_iter().map(Into::into));
        self
    }

    /// Require access to a module.
    pub fn module(mut self, module: impl Into<ModuleId>) -> Self {
        self.modules.push(module.into());
        self
    }

    /// Require admin status.
    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    /// Require super-admin status.
    pub fn super_admin(mut self) -> Self {
        self.super_admin = true;
        self
    }

    /// Whether the requirement has no conditions.
    pub fn is_unrestricted(&self) -> bool {
        self == &Self::default()
    }
}

impl<R> AccessEvaluator<R>
where
    R: ModuleRegistry,
{
    /// Evaluate a requirement, reporting the first unmet condition.
    pub fn check(&self, requirement: &AccessRequirement) -> AccessResult {
        if !self.permissions_loaded() {
            return AccessResult::Pending;
        }

        if requirement.super_admin && !self.is_super_admin() {
            return AccessResult::Denied("super admin role required".to_string());
        }

        if requirement.admin && !self.is_admin() {
            return AccessResult::Denied("admin role required".to_string());
        }

        if let Some(role) = requirement.roles.iter().find(|role| !self.has_role(role)) {
            return AccessResult::Denied(format!("role '{role}' required"));
        }

        if !requirement.any_roles.is_empty()
            && !self.has_any_role(requirement.any_roles.as_slice())
        {
            return AccessResult::Denied(format!(
                "one of roles [{}] required",
                requirement.any_roles.join(", ")
            ));
        }

        if let Some(permission) = requirement
            .permissions
            .iter()
            .find(|permission| !self.has_permission(permission.as_str()))
        {
            return AccessResult::Denied(format!("permission '{permission}' required"));
        }

        if let Some(module) = requirement
            .modules
            .iter()
            .find(|module| !self.has_module_access(module.as_str()))
        {
            return AccessResult::Denied(format!("module '{module}' not accessible"));
        }

        AccessResult::Granted
    }

    /// Shorthand for `check(requirement).is_granted()`.
    pub fn allows(&self, requirement: &AccessRequirement) -> bool {
        self.check(requirement).is_granted()
    }
}
