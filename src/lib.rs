//! # Role Gate
//!
//! This crate provides the authorization core of an administrative back office:
//! a time-boxed management cache for expensive list and stats queries, and an
//! evaluator that answers role, permission and module questions about the
//! signed-in user without further network access.
//!
//! ## Features
//!
//! - Generic TTL cache with lazy expiry-on-read
//! - Family-indexed invalidation (`roles`, `users`, `permissions`, `modules`, ...)
//! - Regex pattern invalidation for ad-hoc key sets
//! - Deterministic cache keys, independent of filter field order
//! - Read-through service that never caches failed fetches
//! - Permission and module unions derived once per user load
//! - Super-admin bypass applied ahead of every permission check
//! - Declarative access requirements for protected regions
//! - Thread-safe implementation
//! - Async read-through and shared evaluator (`async` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use role_gate::{
//!     AccessEvaluator, AccessRequirement, CacheFamily, CacheInvalidation,
//!     ManagementCacheService, QueryDescriptor, Role, User,
//! };
//!
//! // Cache backend queries
//! let service = ManagementCacheService::new(|query: &QueryDescriptor| -> role_gate::error::Result<u64> {
//!     Ok(match query.family {
//!         CacheFamily::Roles => 4,
//!         _ => 0,
//!     })
//! });
//!
//! let stats = QueryDescriptor::stats(CacheFamily::Roles);
//! assert_eq!(service.load(&stats)?, 4);
//!
//! // After a successful write to roles
//! service.invalidate_roles_cache();
//!
//! // Evaluate access for the signed-in user
//! let user = User::new("user1").with_roles(vec![
//!     Role::new("admin").add_permission("users.read"),
//! ]);
//! let mut evaluator = AccessEvaluator::new();
//! evaluator.load_user(user);
//!
//! assert!(evaluator.has_permission("users.read"));
//! assert!(!evaluator.has_permission("users.delete"));
//! assert!(evaluator.is_admin());
//! assert!(evaluator.allows(&AccessRequirement::new().permission("users.read")));
//! # Ok::<(), role_gate::Error>(())
//! ```
//!
//! ## Audit Logging
//!
//! When the `audit` feature is enabled, Role Gate logs cache invalidations,
//! failed fetches and permission loads using the standard Rust logging
//! framework. To enable logging:
//!
//! ```rust
//! use role_gate::init_audit_logger;
//!
//! // Initialize logging (must be called early in program execution)
//! init_audit_logger();
//!
//! // Configure log level through RUST_LOG environment variable:
//! // RUST_LOG=info,role_gate=debug
//! ```

#[cfg(feature = "audit")]
pub fn init_audit_logger() {
    let _ = env_logger::try_init();
}

pub mod macros;

pub mod cache;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod keys;
pub mod metrics;
pub mod permission;
pub mod registry;
pub mod role;
pub mod service;
pub mod user;


#[cfg(feature = "async")]
pub mod async_support;

// Re-export main types for convenience
pub use crate::{
    cache::{CacheEntry, CacheInvalidation, CacheStats, TtlCache},
    config::{CacheConfig, EvaluatorConfig},
    error::Error,
    evaluator::{AccessEvaluator, DerivedAccess, LoadState},
    guard::{AccessRequirement, AccessResult},
    keys::{CacheFamily, CacheKey},
    metrics::{CacheMetrics, MetricsSummary},
    permission::{ModuleId, PermissionId},
    registry::{AllModulesEnabled, MemoryModuleRegistry, Module, ModuleRegistry},
    role::Role,
    service::{ManagementCacheService, Mutation, MutationKind, QueryDescriptor, QueryFetcher},
    user::User,
};

#[cfg(feature = "async")]
pub use crate::async_support::{AsyncManagementCacheService, AsyncQueryFetcher, SharedAccessEvaluator};
