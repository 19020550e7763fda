//! Shared fixtures: a small library of authors, books and tags

#![allow(dead_code)]

use ouroboros_proxy::{
    Capability, CollectionShape, EntitySchema, Identity, InMemoryStore, PropertyDescriptor,
    ProxyConfig, ProxyFactory, Record, SessionCache,
};
use std::sync::Arc;

pub const LE_GUIN: Identity = Identity::new(1);
pub const BUTLER: Identity = Identity::new(2);

pub const DISPOSSESSED: Identity = Identity::new(10);
pub const LEFT_HAND: Identity = Identity::new(11);
pub const KINDRED: Identity = Identity::new(12);

pub const UTOPIA: Identity = Identity::new(20);
pub const ANARCHY: Identity = Identity::new(21);

pub struct Schemas {
    pub author: Arc<EntitySchema>,
    pub book: Arc<EntitySchema>,
    pub tag: Arc<EntitySchema>,
}

pub fn schemas() -> Schemas {
    let identified = Capability::new("Identified").scalar("Identity").shared();
    let named = Capability::new("Named")
        .extends(identified.clone())
        .scalar("Name")
        .shared();

    let author = EntitySchema::new("Author")
        .implements(
            Capability::new("Author")
                .extends(named.clone())
                .property(PropertyDescriptor::collection("Books", CollectionShape::Set))
                .shared(),
        )
        .shared();

    let book = EntitySchema::new("Book")
        .implements(identified)
        .implements(
            Capability::new("Book")
                .scalar("Title")
                .scalar("Year")
                .property(PropertyDescriptor::entity("Author"))
                .property(PropertyDescriptor::collection("Tags", CollectionShape::List))
                .property(PropertyDescriptor::collection("Related", CollectionShape::SortedSet))
                .shared(),
        )
        .shared();

    let tag = EntitySchema::new("Tag")
        .implements(Capability::new("Tag").extends(named).shared())
        .shared();

    Schemas { author, book, tag }
}

/// Store seeded with two authors, three books and two tags
pub fn library() -> InMemoryStore {
    let Schemas { author, book, tag } = schemas();
    let store = InMemoryStore::new();

    store.insert(
        Record::new(author.clone(), LE_GUIN)
            .with_scalar("Name", "Ursula K. Le Guin")
            .with_refs("Books", "Book", [DISPOSSESSED, LEFT_HAND]),
    );
    store.insert(
        Record::new(author, BUTLER)
            .with_scalar("Name", "Octavia E. Butler")
            .with_refs("Books", "Book", [KINDRED]),
    );

    store.insert(
        Record::new(book.clone(), DISPOSSESSED)
            .with_scalar("Title", "The Dispossessed")
            .with_scalar("Year", 1974)
            .with_ref("Author", "Author", LE_GUIN)
            .with_refs("Tags", "Tag", [UTOPIA, ANARCHY, UTOPIA])
            .with_refs("Related", "Book", [LEFT_HAND, KINDRED])
            .ordered_by("Year"),
    );
    store.insert(
        Record::new(book.clone(), LEFT_HAND)
            .with_scalar("Title", "The Left Hand of Darkness")
            .with_scalar("Year", 1969)
            .with_ref("Author", "Author", LE_GUIN)
            .ordered_by("Year"),
    );
    store.insert(
        Record::new(book, KINDRED)
            .with_scalar("Title", "Kindred")
            .with_scalar("Year", 1979)
            .with_ref("Author", "Author", BUTLER)
            .ordered_by("Year"),
    );

    store.insert(Record::new(tag.clone(), UTOPIA).with_scalar("Name", "utopia"));
    store.insert(Record::new(tag, ANARCHY).with_scalar("Name", "anarchy"));

    store
}

/// Factory over `store` with its own session cache
pub fn session_factory(store: &InMemoryStore, config: ProxyConfig) -> Arc<ProxyFactory> {
    let cache = Arc::new(SessionCache::open(&config));
    ProxyFactory::new(Arc::new(store.clone()), cache, config)
}
