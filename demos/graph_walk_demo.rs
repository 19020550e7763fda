//! Demonstrates walking an entity graph through proxies
//!
//! This example shows how to:
//! - Declare entity schemas
//! - Obtain canonical proxies from a factory
//! - Resolve relations lazily and observe the fetches
//! - Merge fresh data into an existing proxy
//!
//! Run with `RUST_LOG=ouroboros_proxy=debug` to see every fetch.

use ouroboros_proxy::{
    Capability, CollectionShape, Comparand, EntitySchema, Identity, InMemoryStore,
    PropertyDescriptor, ProxyConfig, ProxyFactory, Record, SessionCache, StoredValue,
};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let team = EntitySchema::new("Team")
        .implements(
            Capability::new("Team")
                .scalar("Name")
                .property(PropertyDescriptor::collection("Members", CollectionShape::SortedSet))
                .shared(),
        )
        .shared();
    let engineer = EntitySchema::new("Engineer")
        .implements(
            Capability::new("Engineer")
                .scalar("Name")
                .scalar("Level")
                .property(PropertyDescriptor::entity("Team"))
                .shared(),
        )
        .shared();

    let store = InMemoryStore::new();
    store.insert(
        Record::new(team, Identity::new(100))
            .with_scalar("Name", "Storage")
            .with_refs("Members", "Engineer", [Identity::new(3), Identity::new(1), Identity::new(2)]),
    );
    for (id, name, level) in [(1, "Grace", 7), (2, "Linus", 5), (3, "Barbara", 6)] {
        store.insert(
            Record::new(engineer.clone(), Identity::new(id))
                .with_scalar("Name", name)
                .with_scalar("Level", level)
                .with_ref("Team", "Team", Identity::new(100))
                .ordered_by("Level"),
        );
    }

    let config = ProxyConfig::from_env()?;
    let cache = Arc::new(SessionCache::open(&config));
    let factory = ProxyFactory::new(Arc::new(store.clone()), cache.clone(), config);

    // 1. Proxy an engineer; scalars are available without a fetch
    println!("1. Loading engineer 1...");
    let grace = factory.get_proxy(
        store
            .snapshot("Engineer", Identity::new(1))
            .ok_or_else(|| anyhow::anyhow!("engineer 1 missing"))?,
    )?;
    println!("   {:?}", grace);
    println!("   Fetches so far: {}", store.fetch_count());

    // 2. Walk to the team and back to its members
    println!("\n2. Walking Engineer -> Team -> Members...");
    let team = grace.get("Team")?;
    let team = team
        .as_entity()
        .ok_or_else(|| anyhow::anyhow!("engineer has no team"))?;
    let members = team.get("Members")?;
    if let Some(members) = members.as_collection() {
        for member in members {
            println!("   - {} {}", member.identity(), member.get("Name")?.to_json());
        }
        let first = members
            .get(0)
            .ok_or_else(|| anyhow::anyhow!("team has no members"))?;
        println!("   Member 1 is the same proxy: {}", Arc::ptr_eq(first, &grace));
    }
    println!("   Fetches so far: {}", store.fetch_count());

    // 3. Resolving again is served from the property bag
    println!("\n3. Resolving the team again...");
    grace.get("Team")?;
    println!("   Fetches so far: {}", store.fetch_count());

    // 4. Merge a promotion into the existing proxy
    println!("\n4. Promoting engineer 2...");
    store.update("Engineer", Identity::new(2), |record| {
        record.set("Level", StoredValue::Scalar(json!(8)));
    });
    let linus = factory.merge_or_create(
        store
            .snapshot("Engineer", Identity::new(2))
            .ok_or_else(|| anyhow::anyhow!("engineer 2 missing"))?,
    )?;
    println!("   Level now {}", linus.get("Level")?.to_json());
    println!(
        "   Engineer 2 vs engineer 1: {:?}",
        linus.compare_to(&Comparand::Proxy(grace.clone()))?
    );

    // 5. Snapshot and statistics
    println!("\n5. Snapshot of engineer 1:");
    println!("{}", serde_json::to_string_pretty(&grace.snapshot())?);
    println!("\n{}", cache.stats());

    factory.clear();
    println!("\n✓ Demo complete");
    Ok(())
}
