//! Cache families and deterministic cache-key construction.
//!
//! Keys have the shape `{family}:{operation}[:{segments}]`, for example
//! `roles:list:1:20:{"search":"ops","status":"active"}`. The family prefix is
//! what the cache indexes on, so every key built here can be invalidated as
//! part of its family without scanning the key space.

use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Logical entity family a cache key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheFamily {
    /// Role lists, role stats, active roles.
    Roles,
    /// User lists and user stats.
    Users,
    /// Permission catalogue queries.
    Permissions,
    /// Module catalogue queries.
    Modules,
    /// Client lists and client stats.
    Clients,
    /// Dashboard analytics.
    Dashboard,
}

impl CacheFamily {
    pub const ALL: [CacheFamily; 6] = [
        CacheFamily::Roles,
        CacheFamily::Users,
        CacheFamily::Permissions,
        CacheFamily::Modules,
        CacheFamily::Clients,
        CacheFamily::Dashboard,
    ];

    /// Key prefix for this family.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheFamily::Roles => "roles",
            CacheFamily::Users => "users",
            CacheFamily::Permissions => "permissions",
            CacheFamily::Modules => "modules",
            CacheFamily::Clients => "clients",
            CacheFamily::Dashboard => "dashboard",
        }
    }

    /// Determine the family of a key from its first segment.
    ///
    /// Returns `None` for keys that were not built with a known family prefix.
    pub fn from_key(key: &str) -> Option<Self> {
        let prefix = key.split(KEY_SEPARATOR).next()?;
        prefix.parse().ok()
    }
}

impl fmt::Display for CacheFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheFamily {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CacheFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or(())
    }
}

/// Builders for cache keys.
pub struct CacheKey;

impl CacheKey {
    /// Key for a paginated, filtered list query.
    pub fn list<F>(family: CacheFamily, page: u32, limit: u32, filters: &F) -> Result<String>
    where
        F: Serialize + ?Sized,
    {
        Ok(format!(
            "{family}:list:{page}:{limit}:{}",
            canonical_filters(filters)?
        ))
    }

    /// Key for a family's aggregate statistics.
    pub fn stats(family: CacheFamily) -> String {
        format!("{family}:stats")
    }

    /// Key for a family's "active only" listing.
    pub fn active(family: CacheFamily) -> String {
        format!("{family}:active")
    }

    /// Key for a single entity.
    pub fn by_id(family: CacheFamily, id: &str) -> String {
        format!("{family}:id:{id}")
    }
}

/// Serialize a filter object so that logically identical filters produce the
/// same string.
///
/// Object fields are emitted in sorted order at every depth and fields whose
/// value is `null` are dropped, so an unset optional filter matches an absent
/// one. A `null` or unit filter serializes to `{}`.
pub fn canonical_filters<F>(filters: &F) -> Result<String>
where
    F: Serialize + ?Sized,
{
    let value = match serde_json::to_value(filters)? {
        Value::Null => Value::Object(Map::new()),
        other => canonicalize(other),
    };
    Ok(value.to_string())
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
