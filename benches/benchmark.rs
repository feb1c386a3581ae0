use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use role_gate::{
    AccessEvaluator, AccessRequirement, CacheFamily, CacheKey, ManagementCacheService,
    QueryDescriptor, Role, TtlCache, User,
};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn loaded_evaluator(roles: usize) -> AccessEvaluator {
    let roles = (0..roles).map(|i| {
        Role::new(format!("role{i}"))
            .add_permissions((0..20).map(|p| format!("resource{i}.action{p}")))
            .add_module(format!("module{i}"))
    });

    let mut evaluator = AccessEvaluator::new();
    evaluator.load_user(User::new("user").with_roles(roles));
    evaluator
}

fn bench_permission_check(c: &mut Criterion) {
    let evaluator = loaded_evaluator(10);

    c.bench_function("permission_check", |b| {
        b.iter(|| black_box(evaluator.has_permission(black_box("resource5.action7"))))
    });

    c.bench_function("permission_check_miss", |b| {
        b.iter(|| black_box(evaluator.has_permission(black_box("resource5.missing"))))
    });
}

fn bench_super_admin_bypass(c: &mut Criterion) {
    let mut evaluator = AccessEvaluator::new();
    evaluator.load_user(User::new("root").with_roles(vec![Role::new("super_admin")]));

    c.bench_function("super_admin_bypass", |b| {
        b.iter(|| black_box(evaluator.has_permission(black_box("anything.at.all"))))
    });
}

fn bench_requirement_check(c: &mut Criterion) {
    let evaluator = loaded_evaluator(10);
    let requirement = AccessRequirement::new()
        .any_role(["role3", "admin"])
        .permission("resource3.action1")
        .permission("resource3.action2")
        .module("module3");

    c.bench_function("requirement_check", |b| {
        b.iter(|| black_box(evaluator.check(&requirement)))
    });
}

fn bench_user_load(c: &mut Criterion) {
    let user = User::new("user").with_roles((0..10).map(|i| {
        Role::new(format!("role{i}"))
            .add_permissions((0..20).map(|p| format!("resource{i}.action{p}")))
    }));

    c.bench_function("user_load", |b| {
        b.iter_batched(
            || user.clone(),
            |user| {
                let mut evaluator = AccessEvaluator::new();
                black_box(evaluator.load_user(user))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_cache_hit(c: &mut Criterion) {
    let cache = TtlCache::new();
    for i in 0..1000 {
        cache.set(CacheKey::by_id(CacheFamily::Users, &i.to_string()), i);
    }

    c.bench_function("cache_hit", |b| {
        b.iter(|| black_box(cache.get(black_box("users:id:500"))))
    });
}

fn bench_list_key(c: &mut Criterion) {
    let filters = json!({
        "status": "active",
        "search": "ana",
        "sort": { "field": "created_at", "direction": "desc" },
        "tags": ["vip", "beta"]
    });

    c.bench_function("list_key", |b| {
        b.iter(|| black_box(CacheKey::list(CacheFamily::Clients, 3, 25, &filters).unwrap()))
    });
}

fn bench_family_invalidation(c: &mut Criterion) {
    c.bench_function("family_invalidation", |b| {
        b.iter_batched(
            || {
                let cache = TtlCache::new();
                for family in CacheFamily::ALL {
                    for i in 0..200 {
                        cache.set(CacheKey::by_id(family, &i.to_string()), i);
                    }
                }
                cache
            },
            |cache| black_box(cache.invalidate_family(CacheFamily::Roles)),
            BatchSize::LargeInput,
        )
    });
}

fn bench_pattern_invalidation(c: &mut Criterion) {
    c.bench_function("pattern_invalidation", |b| {
        b.iter_batched(
            || {
                let cache = TtlCache::new();
                for family in CacheFamily::ALL {
                    for i in 0..200 {
                        cache.set(CacheKey::by_id(family, &i.to_string()), i);
                    }
                }
                cache
            },
            |cache| black_box(cache.invalidate_pattern("^roles:").unwrap()),
            BatchSize::LargeInput,
        )
    });
}

fn bench_read_through_hit(c: &mut Criterion) {
    let service = ManagementCacheService::new(
        |query: &QueryDescriptor| -> role_gate::error::Result<String> { query.cache_key() },
    );
    let query = QueryDescriptor::list(CacheFamily::Users, 1, 10, &json!({"status": "active"}))
        .unwrap();
    service.load(&query).unwrap();

    c.bench_function("read_through_hit", |b| {
        b.iter(|| black_box(service.load(&query).unwrap()))
    });
}

fn bench_concurrent_cache_access(c: &mut Criterion) {
    let cache = Arc::new(TtlCache::new());
    for i in 0..100 {
        cache.set(CacheKey::by_id(CacheFamily::Roles, &i.to_string()), i);
    }

    c.bench_function("concurrent_cache_access", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let cache = Arc::clone(&cache);
                    std::thread::spawn(move || {
                        (0..100)
                            .filter(|i| {
                                let id = ((i + t) % 100).to_string();
                                cache.contains_key(&CacheKey::by_id(CacheFamily::Roles, &id))
                            })
                            .count()
                    })
                })
                .collect();
            let hits: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
            black_box(hits)
        })
    });
}

criterion_group!(
    benches,
    bench_permission_check,
    bench_super_admin_bypass,
    bench_requirement_check,
    bench_user_load,
    bench_cache_hit,
    bench_list_key,
    bench_family_invalidation,
    bench_pattern_invalidation,
    bench_read_through_hit,
    bench_concurrent_cache_access
);
criterion_main!(benches);
