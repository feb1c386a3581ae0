//! Configuration for the cache and the access evaluator.

use crate::error::{Error, Result};
use chrono::Duration;

/// Default time-to-live for cached query results (5 minutes).
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// Role name that grants administrator status.
pub const ADMIN_ROLE: &str = "admin";

/// Role name that grants super-administrator status and the permission bypass.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Configuration for [`TtlCache`](crate::cache::TtlCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied by `set` when no explicit TTL is given.
    pub default_ttl: Duration,
    /// Whether hit/miss/store counters are recorded.
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::seconds(DEFAULT_TTL_SECONDS),
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with a custom default TTL.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl < Duration::zero() {
            return Err(Error::InvalidConfiguration(format!(
                "default TTL must not be negative, got {}s",
                self.default_ttl.num_seconds()
            )));
        }
        Ok(())
    }
}

/// Configuration for [`AccessEvaluator`](crate::evaluator::AccessEvaluator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Role name checked by `is_admin`.
    pub admin_role: String,
    /// Role name checked by `is_super_admin`.
    pub super_admin_role: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            admin_role: ADMIN_ROLE.to_string(),
            super_admin_role: SUPER_ADMIN_ROLE.to_string(),
        }
    }
}

impl EvaluatorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.admin_role.trim().is_empty() || self.super_admin_role.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "admin and super-admin role names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
