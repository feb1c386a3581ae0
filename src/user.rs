//! The user record supplied by the authentication/session layer.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Initials shown when a user has neither a name nor an email.
pub const PLACEHOLDER_INITIALS: &str = "U";

/// An authenticated user and the roles loaded for them.
///
/// `roles` is `None` while the role list has not been fetched (or the record
/// simply lacks the field); the evaluator treats that as "no roles" and stays
/// in its not-loaded state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    /// Assigned roles, in the order the backend returned them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roles: Option<Vec<Role>>,
}

impl User {
    /// Create a user with no profile fields and no loaded roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            first_name: None,
            last_name: None,
            roles: None,
        }
    }

    /// Get the user's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Set the loaded role list, replacing any previous one.
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = Some(roles.into_iter().collect());
        self
    }

    /// Append a role, marking the role list as loaded.
    pub fn add_role(mut self, role: Role) -> Self {
        self.roles.get_or_insert_with(Vec::new).push(role);
        self
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// The loaded roles; empty when none were loaded.
    pub fn roles(&self) -> &[Role] {
        self.roles.as_deref().unwrap_or_default()
    }

    /// Whether the role list has been loaded (possibly empty).
    pub fn has_loaded_roles(&self) -> bool {
        self.roles.is_some()
    }

    /// Display name: first and last name, else the email, else an empty string.
    pub fn display_name(&self) -> String {
        let full_name = [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full_name.is_empty() {
            return full_name;
        }

        self.email()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    /// Uppercased initials of first and last name, else the first letter of
    /// the email, else [`PLACEHOLDER_INITIALS`].
    pub fn initials(&self) -> String {
        let initials: String = [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .filter_map(first_letter)
            .flat_map(char::to_uppercase)
            .collect();

        if !initials.is_empty() {
            return initials;
        }

        self.email()
            .and_then(first_letter)
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| PLACEHOLDER_INITIALS.to_string())
    }
}

fn first_letter(value: &str) -> Option<char> {
    value.trim().chars().next()
}
