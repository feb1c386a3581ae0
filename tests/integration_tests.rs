//! End-to-end scenarios for the management cache and the access evaluator.

use role_gate::{
    AccessEvaluator, AccessRequirement, CacheConfig, CacheFamily, CacheInvalidation,
    ManagementCacheService, MemoryModuleRegistry, Module, Mutation, QueryDescriptor, Role,
    TtlCache, User, error::Error, role,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

type FetchResult<V> = role_gate::error::Result<V>;
type JsonFetcher = Box<dyn Fn(&QueryDescriptor) -> FetchResult<Value> + Send + Sync>;
type JsonService = ManagementCacheService<Value, JsonFetcher>;

#[derive(Serialize)]
struct UserFilters<'a> {
    search: Option<&'a str>,
    status: &'a str,
}

fn counting_service() -> (JsonService, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let fetcher: JsonFetcher = Box::new(move |query: &QueryDescriptor| -> FetchResult<Value> {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "key": query.cache_key()?, "call": call }))
    });
    (ManagementCacheService::new(fetcher), calls)
}

#[test]
fn test_back_office_session() {
    let registry = MemoryModuleRegistry::with_modules([
        Module::new("users", "Users"),
        Module::new("clients", "Clients"),
        Module::new("billing", "Billing").disabled(),
    ]);

    let manager = role! {
        name: "manager",
        permissions: ["users.read", "clients.read", "clients.write"],
        modules: ["users", "clients", "billing"]
    };
    let auditor = role! {
        name: "auditor",
        permissions: ["users.read", "audit.read"],
        modules: ["users"]
    };

    let user = User::new("u-42")
        .with_email("ana.lopez@example.com")
        .with_first_name("Ana")
        .with_last_name("Lopez")
        .with_roles(vec![manager, auditor]);

    let mut evaluator = AccessEvaluator::with_registry(registry.clone());
    evaluator.load_user(user);

    assert!(evaluator.permissions_loaded());
    assert_eq!(evaluator.permissions().len(), 4);
    assert!(evaluator.has_permission("audit.read"));
    assert!(evaluator.has_all_permissions(&["users.read", "clients.write"]));
    assert!(!evaluator.has_permission("users.delete"));

    assert!(evaluator.has_module_access("clients"));
    assert!(!evaluator.has_module_access("billing"));

    registry.set_enabled("billing", true);
    evaluator.refresh_modules();
    assert!(evaluator.has_module_access("billing"));

    assert_eq!(evaluator.user_name(), "Ana Lopez");
    assert_eq!(evaluator.user_initials(), "AL");

    let can_edit_clients = AccessRequirement::new()
        .any_role(["manager", "admin"])
        .permission("clients.write")
        .module("clients");
    assert!(evaluator.allows(&can_edit_clients));

    let admin_only = AccessRequirement::new().admin();
    assert_eq!(
        evaluator.check(&admin_only).denial_reason(),
        Some("admin role required")
    );

    evaluator.unload();
    assert!(evaluator.check(&can_edit_clients).is_pending());
    assert_eq!(evaluator.user_initials(), "U");
}

#[test]
fn test_list_queries_share_entries_across_filter_order() {
    let (service, calls) = counting_service();

    let typed = QueryDescriptor::list(
        CacheFamily::Users,
        2,
        25,
        &UserFilters {
            search: None,
            status: "active",
        },
    )
    .unwrap();
    let untyped =
        QueryDescriptor::list(CacheFamily::Users, 2, 25, &json!({"status": "active"})).unwrap();

    assert_eq!(typed.cache_key().unwrap(), untyped.cache_key().unwrap());

    service.load(&typed).unwrap();
    service.load(&untyped).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let other_page =
        QueryDescriptor::list(CacheFamily::Users, 3, 25, &json!({"status": "active"})).unwrap();
    service.load(&other_page).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_write_flow_invalidates_stale_lists() {
    let (service, calls) = counting_service();

    let roles_page = QueryDescriptor::first_page(CacheFamily::Roles);
    let roles_stats = QueryDescriptor::stats(CacheFamily::Roles);
    let clients_page = QueryDescriptor::first_page(CacheFamily::Clients);

    for query in [&roles_page, &roles_stats, &clients_page] {
        service.load(query).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // A role was created elsewhere in the back office.
    assert_eq!(
        service.notify_mutation(&Mutation::created(CacheFamily::Roles)),
        2
    );

    service.load(&clients_page).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    service.load(&roles_page).unwrap();
    service.load(&roles_stats).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    assert_eq!(service.invalidate_clients_cache(), 1);
    assert_eq!(service.invalidate_modules_cache(), 0);
}

#[test]
fn test_failing_backend_recovers() {
    let healthy = Arc::new(AtomicBool::new(false));
    let switch = Arc::clone(&healthy);
    let service = ManagementCacheService::new(
        move |query: &QueryDescriptor| -> FetchResult<u32> {
            if switch.load(Ordering::SeqCst) {
                Ok(42)
            } else {
                Err(Error::fetch(query.cache_key()?, "connection refused"))
            }
        },
    );

    let query = QueryDescriptor::stats(CacheFamily::Dashboard);
    let error = service.load(&query).unwrap_err();
    assert_eq!(error.kind(), "fetch");
    assert!(error.to_string().contains("dashboard:stats"));
    assert!(service.cache().is_empty());

    healthy.store(true, Ordering::SeqCst);
    assert_eq!(service.load(&query).unwrap(), 42);
    assert_eq!(service.cache().len(), 1);
}

#[test]
fn test_shared_cache_between_services() {
    let cache = Arc::new(TtlCache::with_config(CacheConfig::with_default_ttl(
        chrono::Duration::minutes(1),
    )));

    let roles = ManagementCacheService::with_cache(
        Arc::clone(&cache),
        |_: &QueryDescriptor| -> FetchResult<Value> { Ok(json!(["admin"])) },
    );
    let users = ManagementCacheService::with_cache(
        Arc::clone(&cache),
        |_: &QueryDescriptor| -> FetchResult<Value> { Ok(json!(["ana"])) },
    );

    roles
        .load(&QueryDescriptor::first_page(CacheFamily::Roles))
        .unwrap();
    users
        .load(&QueryDescriptor::first_page(CacheFamily::Users))
        .unwrap();
    assert_eq!(cache.len(), 2);

    // Either service can invalidate entries stored by the other.
    assert_eq!(users.invalidate_roles_cache(), 1);
    assert_eq!(cache.keys(), vec!["users:list:1:10:{}".to_string()]);
}

#[test]
fn test_pattern_invalidation_for_ad_hoc_sets() {
    let cache = TtlCache::new();
    cache.set("users:list:1:10:{}", 1);
    cache.set("users:list:2:10:{}", 2);
    cache.set("users:stats", 3);
    cache.set("roles:list:1:10:{}", 4);

    assert_eq!(cache.invalidate_pattern(r"^users:list:").unwrap(), 2);
    assert_eq!(cache.get("users:stats"), Some(3));
    assert_eq!(cache.get("roles:list:1:10:{}"), Some(4));

    assert!(matches!(
        cache.invalidate_pattern("users:("),
        Err(Error::InvalidPattern { .. })
    ));
}

#[test]
fn test_user_from_json_payload() {
    let payload = json!({
        "id": "u-7",
        "email": "root@example.com",
        "roles": [
            { "id": "r-1", "name": "super_admin" }
        ]
    });
    let user: User = serde_json::from_value(payload).unwrap();

    let mut evaluator = AccessEvaluator::new();
    evaluator.load_user(user);

    assert!(evaluator.is_super_admin());
    assert!(evaluator.is_admin());
    assert!(evaluator.has_permission("anything.at.all"));
    assert_eq!(evaluator.user_name(), "root@example.com");
    assert_eq!(evaluator.user_initials(), "R");

    let without_roles: User = serde_json::from_value(json!({ "id": "u-8" })).unwrap();
    evaluator.load_user(without_roles);
    assert!(!evaluator.permissions_loaded());
    assert!(!evaluator.has_permission("anything.at.all"));
}

#[test]
fn test_role_round_trips_through_json() {
    let role = Role::with_id("r-9", "support")
        .with_description("Front-line support")
        .add_permission("tickets.read")
        .add_module("tickets");

    let encoded = serde_json::to_string(&role).unwrap();
    let decoded: Role = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded.id(), "r-9");
    assert_eq!(decoded.description(), Some("Front-line support"));
    assert!(decoded.has_permission("tickets.read"));
    assert!(decoded.has_module("tickets"));
}
