mod store_common;

use std::collections::BTreeSet;

use graphstage::{
    Capabilities, Capability, FaultPoint, Graph, GraphStatus, MemoryBackend, PersistentStore,
    SessionOptions, StoreError,
};
use store_common::{name, seeded_backend, triple};

#[test]
fn added_graph_reaches_backend_on_flush() {
    let mut store = PersistentStore::new(seeded_backend());
    let handle = store
        .add_graph(Graph::with_triples(name("urn:new"), [triple("x", "y")]))
        .unwrap();

    let report = store.flush().unwrap();
    assert_eq!(report.graphs_created, 1);
    assert_eq!(
        store.backend().snapshot(&name("urn:new")),
        Some(BTreeSet::from([triple("x", "y")]))
    );
    assert_eq!(store.status(&name("urn:new")), GraphStatus::PresentClean);
    assert!(!handle.is_new_graph());
    assert!(!handle.is_dirty());
    assert!(store.is_fully_synced());
}

#[test]
fn empty_new_graph_is_created() {
    let mut store = PersistentStore::new(seeded_backend());
    store.add_graph(Graph::new(name("urn:empty"))).unwrap();
    store.flush().unwrap();
    assert_eq!(
        store.backend().snapshot(&name("urn:empty")),
        Some(BTreeSet::new())
    );
}

#[test]
fn new_graphs_use_save_when_incremental_creation_is_off() {
    let options = SessionOptions {
        prefer_incremental_updates: false,
    };
    let mut store = PersistentStore::with_options(seeded_backend(), options);
    store
        .add_graph(Graph::with_triples(name("urn:new"), [triple("x", "y")]))
        .unwrap();
    store.flush().unwrap();

    let stats = store.backend().stats();
    assert_eq!(stats.saves, 1);
    assert_eq!(stats.updates, 0);
}

#[test]
fn removed_graph_is_deleted_on_flush() {
    let mut store = PersistentStore::new(seeded_backend());
    let places = store.graph(&name("urn:places")).unwrap();
    store.remove_graph(&name("urn:places")).unwrap();

    let report = store.flush().unwrap();
    assert_eq!(report.graphs_deleted, 1);
    assert!(!store.backend().contains_graph(&name("urn:places")));
    assert!(!store.has_graph(&name("urn:places")).unwrap());
    assert!(!places.is_attached());
    assert_eq!(places.len(), 1);
}

#[test]
fn add_then_remove_never_touches_backend() {
    let mut store = PersistentStore::new(seeded_backend());
    store
        .add_graph(Graph::with_triples(name("urn:temp"), [triple("x", "y")]))
        .unwrap();
    store.remove_graph(&name("urn:temp")).unwrap();

    let report = store.flush().unwrap();
    assert!(report.is_noop());
    assert_eq!(store.backend().stats().writes(), 0);
    assert!(!store.backend().contains_graph(&name("urn:temp")));
    assert!(!store.has_graph(&name("urn:temp")).unwrap());
}

#[test]
fn remove_then_add_same_content_is_net_noop() {
    let mut store = PersistentStore::new(seeded_backend());
    store.remove_graph(&name("urn:places")).unwrap();
    store
        .add_graph(Graph::with_triples(
            name("urn:places"),
            [triple("paris", "france")],
        ))
        .unwrap();

    let report = store.flush().unwrap();
    assert!(report.is_noop());
    assert_eq!(store.backend().stats().writes(), 0);
    assert_eq!(
        store.backend().snapshot(&name("urn:places")),
        Some(BTreeSet::from([triple("paris", "france")]))
    );
}

#[test]
fn dirty_graph_is_written_incrementally() {
    let mut store = PersistentStore::new(seeded_backend());
    let people = store.graph(&name("urn:people")).unwrap();
    people.assert(triple("erin", "frank"));
    people.retract(&triple("alice", "carol"));

    let report = store.flush().unwrap();
    assert_eq!(report.graphs_updated, 1);
    assert_eq!(report.graphs_rewritten, 0);
    assert_eq!(
        store.backend().snapshot(&name("urn:people")),
        Some(BTreeSet::from([triple("bob", "dave"), triple("erin", "frank")]))
    );
    assert!(!people.is_dirty());
    assert_eq!(store.backend().stats().saves, 0);
}

#[test]
fn dirty_graph_without_incremental_updates_is_rewritten() {
    let backend = MemoryBackend::with_capabilities(
        Capabilities::read_write()
            .with(Capability::ListGraphs)
            .with(Capability::DeleteGraph),
    );
    backend.insert_graph(name("urn:people"), [triple("alice", "carol")]);
    let mut store = PersistentStore::new(backend);
    let people = store.graph(&name("urn:people")).unwrap();
    people.assert(triple("erin", "frank"));

    // Written behind the session's back; the rewrite reloads and keeps it.
    store
        .backend()
        .insert_graph(name("urn:people"), [triple("alice", "carol"), triple("zed", "z")]);

    let report = store.flush().unwrap();
    assert_eq!(report.graphs_rewritten, 1);
    assert_eq!(
        store.backend().snapshot(&name("urn:people")),
        Some(BTreeSet::from([
            triple("alice", "carol"),
            triple("erin", "frank"),
            triple("zed", "z"),
        ]))
    );
    let stats = store.backend().stats();
    assert_eq!(stats.updates, 0);
    assert_eq!(stats.loads, 2);
    assert_eq!(stats.saves, 1);
}

#[test]
fn second_flush_makes_no_backend_calls() {
    let mut store = PersistentStore::new(seeded_backend());
    store.graph(&name("urn:people")).unwrap().assert(triple("erin", "frank"));
    store.remove_graph(&name("urn:places")).unwrap();
    store.add_graph(Graph::new(name("urn:new"))).unwrap();

    store.flush().unwrap();
    let after_first = store.backend().stats();
    let report = store.flush().unwrap();

    assert!(report.is_noop());
    assert_eq!(store.backend().stats(), after_first);
}

#[test]
fn removal_without_delete_capability_is_unsupported() {
    let backend = MemoryBackend::with_capabilities(
        Capabilities::all().without(Capability::DeleteGraph),
    );
    backend.insert_graph(name("urn:a"), []);
    let mut store = PersistentStore::new(backend);
    store.remove_graph(&name("urn:a")).unwrap();

    let err = store.flush().unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnsupportedCapability(Capability::DeleteGraph)
    ));
    assert_eq!(store.status(&name("urn:a")), GraphStatus::PendingRemoval);
    assert!(store.backend().contains_graph(&name("urn:a")));
}

#[test]
fn failed_flush_keeps_completed_graphs_and_retries_the_rest() {
    let mut store = PersistentStore::new(seeded_backend());
    store
        .add_graph(Graph::with_triples(name("urn:a"), [triple("a", "1")]))
        .unwrap();
    store
        .add_graph(Graph::with_triples(name("urn:b"), [triple("b", "2")]))
        .unwrap();
    store.backend().faults().configure_after(FaultPoint::UpdateGraph, 1, 1);

    let err = store.flush().unwrap_err();
    assert!(err.to_string().contains("fault injected"), "got {err:?}");
    assert_eq!(store.status(&name("urn:a")), GraphStatus::PresentClean);
    assert_eq!(store.status(&name("urn:b")), GraphStatus::PendingAddition);
    assert!(store.backend().contains_graph(&name("urn:a")));
    assert!(!store.backend().contains_graph(&name("urn:b")));
    assert!(!store.is_fully_synced());

    let updates_before_retry = store.backend().stats().updates;
    let report = store.flush().unwrap();
    assert_eq!(report.graphs_created, 1);
    assert_eq!(store.backend().stats().updates, updates_before_retry + 1);
    assert!(store.backend().contains_graph(&name("urn:b")));
    assert!(store.is_fully_synced());
}

#[test]
fn failed_deletion_aborts_before_additions() {
    let mut store = PersistentStore::new(seeded_backend());
    store.remove_graph(&name("urn:places")).unwrap();
    store.add_graph(Graph::new(name("urn:new"))).unwrap();
    store.backend().faults().configure(FaultPoint::DeleteGraph, 1);

    assert!(store.flush().is_err());
    assert!(!store.backend().contains_graph(&name("urn:new")));
    assert_eq!(store.status(&name("urn:places")), GraphStatus::PendingRemoval);

    store.flush().unwrap();
    assert!(!store.backend().contains_graph(&name("urn:places")));
    assert!(store.backend().contains_graph(&name("urn:new")));
}
