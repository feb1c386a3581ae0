//! Convenience macros.

/// Macro for creating a set of permission identifiers.
///
/// # Examples
///
/// ```rust
/// use role_gate::permissions;
///
/// let perms = permissions!["users.read", "users.write", "users.read"];
/// assert_eq!(perms.len(), 2);
/// ```
#[macro_export]
macro_rules! permissions {
    ($($permission:expr),* $(,)?) => {
        {
            let mut set = ::std::collections::HashSet::new();
            $(
                set.insert($crate::permission::PermissionId::from($permission));
            )*
            set
        }
    };
}

/// Macro for creating a role with permissions and modules in a single expression.
///
/// # Examples
///
/// ```rust
/// use role_gate::role;
///
/// let role = role! {
///     name: "manager",
///     permissions: ["clients.read", "clients.write"],
///     modules: ["clients", "dashboard"]
/// };
/// assert!(role.has_permission("clients.write"));
/// assert!(role.has_module("dashboard"));
/// ```
#[macro_export]
macro_rules! role {
    (
        name: $name:expr,
        permissions: [$($permission:expr),* $(,)?],
        modules: [$($module:expr),* $(,)?] $(,)?
    ) => {
        {
            let role = $crate::role::Role::new($name);
            $(
                let role = role.add_permission($permission);
            )*
            $(
                let role = role.add_module($module);
            )*
            role
        }
    };
    (
        name: $name:expr,
        permissions: [$($permission:expr),* $(,)?] $(,)?
    ) => {
        $crate::role! { name: $name, permissions: [$($permission),*], modules: [] }
    };
    (name: $name:expr $(,)?) => {
        $crate::role::Role::new($name)
    };
}
