//! Demonstrates per-session identity maps
//!
//! This example shows how to:
//! - Open sessions lazily by id
//! - Keep proxies isolated between sessions
//! - Tear sessions down explicitly

use ouroboros_proxy::{
    Call, Capability, EntitySchema, Identity, InMemoryStore, Intercept, ProxyConfig, Record,
    SessionRegistry,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let document = EntitySchema::new("Document")
        .implements(Capability::new("Document").scalar("Title").scalar("Draft").shared())
        .shared();

    let store = InMemoryStore::new();
    store.insert(
        Record::new(document, Identity::new(1))
            .with_scalar("Title", "Release notes")
            .with_scalar("Draft", true),
    );

    let registry = SessionRegistry::new(Arc::new(store.clone()), ProxyConfig::from_env()?);

    // 1. Two sessions see the same document through different proxies
    println!("1. Opening two sessions...");
    let alice = registry.session(Uuid::new_v4());
    let bob = registry.open();

    let entity = || {
        store
            .snapshot("Document", Identity::new(1))
            .ok_or_else(|| anyhow::anyhow!("document missing"))
    };
    let seen_by_alice = alice.proxy(entity()?)?;
    let seen_by_bob = bob.proxy(entity()?)?;
    println!("   Alice: {:?}", seen_by_alice);
    println!("   Bob:   {:?}", seen_by_bob);
    println!("   Same proxy: {}", Arc::ptr_eq(&seen_by_alice, &seen_by_bob));

    // 2. Local edits stay in the session that made them
    println!("\n2. Alice edits her view...");
    seen_by_alice.invoke(&Call::setter("Draft", json!(false)))?;
    let reply = seen_by_bob.invoke(&Call::getter("Draft"))?;
    println!(
        "   Bob still sees Draft = {}",
        reply.as_value().map(|value| value.to_json()).unwrap_or_default()
    );

    // 3. Close sessions
    println!("\n3. Closing sessions...");
    registry.close(alice.id());
    println!("   Alice closed: {}", alice.is_closed());
    println!("   Open sessions: {}", registry.len());
    println!("   Closed remaining: {}", registry.close_all());

    println!("\n✓ Demo complete");
    Ok(())
}
