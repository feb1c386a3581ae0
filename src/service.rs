//! Read-through management cache service.
//!
//! The service sits between the back office's data-access layer and the TTL
//! cache: a query is looked up by its computed key, and only on a miss is the
//! [`QueryFetcher`] collaborator called. Successful results are stored;
//! failures are returned to the caller and never cached, so the next request
//! retries the fetch.

#[cfg(feature = "audit")]
use log::{info, warn};

use crate::{
    cache::{CacheInvalidation, TtlCache},
    error::Result,
    keys::{CacheFamily, CacheKey},
    metrics::FetchTimer,
};
use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Default page size for list queries.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The kind of query issued against an entity family.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperation {
    /// Paginated, filtered listing.
    List {
        page: u32,
        limit: u32,
        filters: Value,
    },
    /// Aggregate statistics.
    Stats,
    /// Active-only listing.
    Active,
    /// A single entity.
    ById(String),
}

/// Description of a backend query, from which its cache key is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub family: CacheFamily,
    pub operation: QueryOperation,
}

impl QueryDescriptor {
    /// A list query with serializable filters.
    pub fn list<F>(family: CacheFamily, page: u32, limit: u32, filters: &F) -> Result<Self>
    where
        F: Serialize + ?Sized,
    {
        Ok(Self {
            family,
            operation: QueryOperation::List {
                page,
                limit,
                filters: serde_json::to_value(filters)?,
            },
        })
    }

    /// An unfiltered first page with the default page size.
    pub fn first_page(family: CacheFamily) -> Self {
        Self {
            family,
            operation: QueryOperation::List {
                page: 1,
                limit: DEFAULT_PAGE_SIZE,
                filters: Value::Null,
            },
        }
    }

    pub fn stats(family: CacheFamily) -> Self {
        Self {
            family,
            operation: QueryOperation::Stats,
        }
    }

    pub fn active(family: CacheFamily) -> Self {
        Self {
            family,
            operation: QueryOperation::Active,
        }
    }

    pub fn by_id(family: CacheFamily, id: impl Into<String>) -> Self {
        Self {
            family,
            operation: QueryOperation::ById(id.into()),
        }
    }

    /// The cache key identical queries share.
    pub fn cache_key(&self) -> Result<String> {
        match &self.operation {
            QueryOperation::List {
                page,
                limit,
                filters,
            } => CacheKey::list(self.family, *page, *limit, filters),
            QueryOperation::Stats => Ok(CacheKey::stats(self.family)),
            QueryOperation::Active => Ok(CacheKey::active(self.family)),
            QueryOperation::ById(id) => Ok(CacheKey::by_id(self.family, id)),
        }
    }
}

/// Backend query collaborator invoked on a cache miss.
pub trait QueryFetcher<V>: Send + Sync {
    /// Run the query against the backing data store.
    fn fetch(&self, query: &QueryDescriptor) -> Result<V>;
}

impl<V, F> QueryFetcher<V> for F
where
    F: Fn(&QueryDescriptor) -> Result<V> + Send + Sync,
{
    fn fetch(&self, query: &QueryDescriptor) -> Result<V> {
        self(query)
    }
}

/// The kind of write that happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

/// Notification that a write to an entity family succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub family: CacheFamily,
    pub kind: MutationKind,
    pub entity_id: Option<String>,
}

impl Mutation {
    pub fn created(family: CacheFamily) -> Self {
        Self {
            family,
            kind: MutationKind::Created,
            entity_id: None,
        }
    }

    pub fn updated(family: CacheFamily, entity_id: impl Into<String>) -> Self {
        Self {
            family,
            kind: MutationKind::Updated,
            entity_id: Some(entity_id.into()),
        }
    }

    pub fn deleted(family: CacheFamily, entity_id: impl Into<String>) -> Self {
        Self {
            family,
            kind: MutationKind::Deleted,
            entity_id: Some(entity_id.into()),
        }
    }
}

/// Read-through cache over a [`QueryFetcher`].
///
/// The cache is shared (`Arc`) so several services, or the caller directly,
/// can address the same store.
pub struct ManagementCacheService<V, F> {
    cache: Arc<TtlCache<V>>,
    fetcher: F,
}

impl<V, F> std::fmt::Debug for ManagementCacheService<V, F>
where
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementCacheService")
            .field("entries", &self.cache.len())
            .finish()
    }
}

impl<V, F> ManagementCacheService<V, F>
where
    V: Clone,
    F: QueryFetcher<V>,
{
    /// Create a service over a fresh cache with the default configuration.
    pub fn new(fetcher: F) -> Self {
        Self::with_cache(Arc::new(TtlCache::new()), fetcher)
    }

    /// Create a service over an existing cache.
    pub fn with_cache(cache: Arc<TtlCache<V>>, fetcher: F) -> Self {
        Self { cache, fetcher }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Arc<TtlCache<V>> {
        &self.cache
    }

    /// Serve a query from the cache, fetching and storing it on a miss.
    pub fn load(&self, query: &QueryDescriptor) -> Result<V> {
        self.load_with_ttl(query, self.cache.config().default_ttl)
    }

    /// Like [`load`](Self::load) with an explicit TTL for the stored result.
    pub fn load_with_ttl(&self, query: &QueryDescriptor, ttl: Duration) -> Result<V> {
        let key = query.cache_key()?;
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }

        let timer = FetchTimer::start(self.cache.metrics());
        let result = self.fetcher.fetch(query);
        timer.finish(result.is_ok());

        match result {
            Ok(data) => {
                self.cache.set_with_ttl(key, data.clone(), ttl);
                Ok(data)
            }
            Err(error) => {
                #[cfg(feature = "audit")]
                warn!("Fetch for '{key}' failed, nothing cached: {error}");

                Err(error)
            }
        }
    }

    /// Invalidate the family a successful write touched.
    pub fn notify_mutation(&self, mutation: &Mutation) -> usize {
        let removed = self.cache.invalidate_family_cache(mutation.family);

        #[cfg(feature = "audit")]
        info!(
            "{:?} on {} ({}) invalidated {removed} cache entries",
            mutation.kind,
            mutation.family,
            mutation.entity_id.as_deref().unwrap_or("-")
        );

        removed
    }
}

impl<V, F> CacheInvalidation for ManagementCacheService<V, F>
where
    V: Clone,
    F: QueryFetcher<V>,
{
    fn invalidate_family_cache(&self, family: CacheFamily) -> usize {
        self.cache.invalidate_family(family)
    }
}
