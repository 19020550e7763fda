//! Integration tests for session lifecycle
//!
//! These tests verify:
//! - Lazy session creation by id
//! - Session isolation of identity maps
//! - Teardown through close and close_all
//! - Identity map statistics per session

mod common;

use common::*;
use ouroboros_proxy::{ProxyConfig, ProxyError, SessionRegistry};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn registry() -> (ouroboros_proxy::InMemoryStore, SessionRegistry) {
    let store = library();
    let registry = SessionRegistry::new(Arc::new(store.clone()), ProxyConfig::default());
    (store, registry)
}

#[test]
fn test_session_is_opened_on_first_use() {
    let (_, registry) = registry();
    let id = Uuid::new_v4();

    assert!(registry.get(id).is_none());
    let session = registry.session(id);
    assert_eq!(session.id(), id);
    assert!(session.cache().is_empty());
    assert!(registry.ids().contains(&id));

    let again = registry.session(id);
    assert!(Arc::ptr_eq(&session, &again));
}

#[test]
fn test_sessions_are_isolated() {
    let (store, registry) = registry();
    let reader = registry.open();
    let editor = registry.open();

    let seen_by_reader = reader.proxy(store.snapshot("Book", KINDRED).unwrap()).unwrap();
    let seen_by_editor = editor.proxy(store.snapshot("Book", KINDRED).unwrap()).unwrap();
    assert!(!Arc::ptr_eq(&seen_by_reader, &seen_by_editor));

    // A merge in one session leaves the other untouched
    store.update("Book", KINDRED, |record| {
        record.set("Year", ouroboros_proxy::StoredValue::Scalar(json!(2003)));
    });
    assert!(editor
        .factory()
        .merge(store.snapshot("Book", KINDRED).unwrap())
        .unwrap());

    assert_eq!(seen_by_editor.get("Year").unwrap().as_scalar(), Some(&json!(2003)));
    assert_eq!(seen_by_reader.get("Year").unwrap().as_scalar(), Some(&json!(1979)));
}

#[test]
fn test_graph_walk_within_session() {
    let (store, registry) = registry();
    let session = registry.open();

    let author = session.proxy(store.snapshot("Author", LE_GUIN).unwrap()).unwrap();
    let books = author.get("Books").unwrap();
    let books = books.as_collection().unwrap().clone();
    assert_eq!(books.len(), 2);

    // Walking back from each book reaches the same author proxy
    for book in &books {
        let back = book.get("Author").unwrap();
        assert!(Arc::ptr_eq(back.as_entity().unwrap(), &author));
    }

    let stats = session.cache().stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.inserts, 3);
    assert!(stats.hits >= 2);
}

#[test]
fn test_close_session() {
    let (store, registry) = registry();
    let session = registry.open();
    let book = session.proxy(store.snapshot("Book", DISPOSSESSED).unwrap()).unwrap();
    book.get("Author").unwrap();

    assert!(registry.close(session.id()));
    assert!(registry.get(session.id()).is_none());
    assert!(session.is_closed());
    assert_eq!(session.cache().stats().clears, 1);

    // Proxies outlive their session as read views of their scalars
    assert_eq!(
        book.get("Title").unwrap().as_scalar(),
        Some(&json!("The Dispossessed"))
    );
    assert!(!book.contains("Author"));

    assert!(matches!(
        session.proxy(store.snapshot("Book", KINDRED).unwrap()),
        Err(ProxyError::SessionClosed)
    ));
    assert!(matches!(book.get("Author"), Err(ProxyError::SessionClosed)));
}

#[test]
fn test_same_id_after_close_opens_fresh_session() {
    let (store, registry) = registry();
    let id = Uuid::new_v4();

    let first = registry.session(id);
    let proxy = first.proxy(store.snapshot("Tag", UTOPIA).unwrap()).unwrap();
    registry.close(id);

    let second = registry.session(id);
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!second.is_closed());

    let fresh = second.proxy(store.snapshot("Tag", UTOPIA).unwrap()).unwrap();
    assert!(!Arc::ptr_eq(&proxy, &fresh));
}

#[test]
fn test_close_all() {
    let (_, registry) = registry();
    let sessions: Vec<_> = (0..3).map(|_| registry.open()).collect();
    assert_eq!(registry.len(), 3);

    assert_eq!(registry.close_all(), 3);
    assert!(registry.is_empty());
    assert!(sessions.iter().all(|session| session.is_closed()));
}

#[test]
fn test_session_timestamps() {
    let (_, registry) = registry();
    let before = chrono::Utc::now();
    let session = registry.open();
    let after = chrono::Utc::now();

    assert!(session.opened_at() >= before);
    assert!(session.opened_at() <= after);
}
