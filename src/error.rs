//! Error types for the management cache and access evaluator.

use thiserror::Error;

/// The main error type for role-gate operations.
///
/// Cache lookups and permission queries never fail; these variants cover the
/// collaborator boundary (fetching) and caller-supplied inputs.
#[derive(Error, Debug)]
pub enum Error {
    /// The backing query collaborator failed to produce data.
    #[error("Fetch failed for '{key}': {message}")]
    Fetch {
        /// Cache key of the query that failed.
        key: String,
        /// Collaborator-supplied failure description.
        message: String,
    },

    /// An invalidation pattern was not a valid regular expression.
    #[error("Invalid invalidation pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// Filter or payload serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl Error {
    /// Build a fetch error for the given cache key.
    pub fn fetch(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Short, stable name of the variant for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Fetch { .. } => "fetch",
            Error::InvalidPattern { .. } => "invalid_pattern",
            Error::Serialization(_) => "serialization",
            Error::InvalidConfiguration(_) => "invalid_configuration",
        }
    }
}

/// Result type alias for role-gate operations.
pub type Result<T> = std::result::Result<T, Error>;
