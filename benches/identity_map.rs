use criterion::{criterion_group, criterion_main, Criterion};
use ouroboros_proxy::{
    Capability, EntitySchema, Identity, InMemoryStore, PropertyDescriptor, ProxyConfig,
    ProxyFactory, Record, SessionCache,
};
use std::hint::black_box;
use std::sync::Arc;

const ITEMS: u64 = 1_000;

fn seeded_store() -> InMemoryStore {
    let item = EntitySchema::new("Item")
        .implements(
            Capability::new("Item")
                .scalar("Name")
                .scalar("Weight")
                .property(PropertyDescriptor::entity("Parent"))
                .shared(),
        )
        .shared();

    let store = InMemoryStore::new();
    for id in 1..=ITEMS {
        store.insert(
            Record::new(item.clone(), Identity::new(id))
                .with_scalar("Name", format!("item-{}", id))
                .with_scalar("Weight", id * 3)
                .with_ref("Parent", "Item", Identity::new(id % ITEMS + 1)),
        );
    }
    store
}

fn session_factory(store: &InMemoryStore) -> Arc<ProxyFactory> {
    let config = ProxyConfig::default();
    let cache = Arc::new(SessionCache::open(&config));
    ProxyFactory::new(Arc::new(store.clone()), cache, config)
}

fn bench_identity_map_hit(c: &mut Criterion) {
    let store = seeded_store();
    let factory = session_factory(&store);
    let entity = store.snapshot("Item", Identity::new(42)).expect("seeded item");
    factory.get_proxy(entity.clone()).expect("warm proxy");

    c.bench_function("identity_map/hit", |b| {
        b.iter(|| {
            let proxy = factory.get_proxy(black_box(entity.clone())).expect("cached proxy");
            black_box(proxy.identity());
        });
    });
}

fn bench_proxy_creation(c: &mut Criterion) {
    let store = seeded_store();
    let entity = store.snapshot("Item", Identity::new(7)).expect("seeded item");

    c.bench_function("identity_map/miss_and_build", |b| {
        let factory = session_factory(&store);
        b.iter(|| {
            factory.clear();
            let proxy = factory.get_proxy(black_box(entity.clone())).expect("new proxy");
            black_box(proxy.loaded_properties().len());
        });
    });
}

fn bench_lazy_resolution(c: &mut Criterion) {
    let store = seeded_store();
    let entity = store.snapshot("Item", Identity::new(9)).expect("seeded item");

    c.bench_function("relation/first_access", |b| {
        let factory = session_factory(&store);
        b.iter(|| {
            factory.clear();
            let proxy = factory.get_proxy(entity.clone()).expect("new proxy");
            let parent = proxy.get(black_box("Parent")).expect("resolve parent");
            black_box(parent.is_null());
        });
    });

    let factory = session_factory(&store);
    let proxy = factory.get_proxy(entity).expect("new proxy");
    proxy.get("Parent").expect("resolve parent");

    c.bench_function("relation/cached_access", |b| {
        b.iter(|| {
            let parent = proxy.get(black_box("Parent")).expect("cached parent");
            black_box(parent.is_null());
        });
    });
}

criterion_group!(
    benches,
    bench_identity_map_hit,
    bench_proxy_creation,
    bench_lazy_resolution
);
criterion_main!(benches);
