mod store_common;

use graphstage::{
    Capabilities, Capability, Graph, GraphName, GraphStatus, MemoryBackend, PersistentStore,
    StoreError, TriplePattern,
};
use store_common::{name, seeded_backend, triple};

#[test]
fn graphs_load_lazily_on_first_access() {
    let mut store = PersistentStore::new(seeded_backend());
    assert_eq!(store.backend().stats().loads, 0);

    let people = store.graph(&name("urn:people")).unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(store.backend().stats().loads, 1);

    let again = store.graph(&name("urn:people")).unwrap();
    assert!(again.ptr_eq(&people));
    assert_eq!(store.backend().stats().loads, 1);
}

#[test]
fn existence_probe_runs_once_per_name() {
    let mut store = PersistentStore::new(seeded_backend());
    assert!(store.has_graph(&name("urn:people")).unwrap());
    assert!(!store.has_graph(&name("urn:missing")).unwrap());
    let after_first = store.backend().stats().data_calls();

    assert!(store.has_graph(&name("urn:people")).unwrap());
    assert!(!store.has_graph(&name("urn:missing")).unwrap());
    assert_eq!(store.backend().stats().data_calls(), after_first);
}

#[test]
fn fetching_absent_graph_is_not_found() {
    let mut store = PersistentStore::new(seeded_backend());
    let err = store.graph(&name("urn:missing")).unwrap_err();
    assert!(err.is_not_found(), "expected not found, got {err:?}");
    assert_eq!(store.status(&name("urn:missing")), GraphStatus::Unknown);
}

#[test]
fn edits_are_visible_without_backend_calls() {
    let mut store = PersistentStore::new(seeded_backend());
    let people = store.graph(&name("urn:people")).unwrap();
    let before = store.backend().stats();

    assert!(people.assert(triple("erin", "frank")));
    assert!(people.contains(&triple("erin", "frank")));
    assert!(people.retract(&triple("alice", "carol")));
    assert!(!people.contains(&triple("alice", "carol")));

    assert_eq!(store.backend().stats(), before);
    assert_eq!(
        store.backend().snapshot(&name("urn:people")).unwrap().len(),
        2
    );
}

#[test]
fn assert_then_retract_leaves_view_unchanged() {
    let mut store = PersistentStore::new(seeded_backend());
    let people = store.graph(&name("urn:people")).unwrap();
    let before = people.triples();

    people.assert(triple("erin", "frank"));
    people.retract(&triple("erin", "frank"));

    assert_eq!(people.triples(), before);
    assert!(!people.is_dirty());
    assert!(store.is_fully_synced());
}

#[test]
fn pattern_reads_see_staged_edits() {
    let mut store = PersistentStore::new(seeded_backend());
    let people = store.graph(&name("urn:people")).unwrap();
    people.retract(&triple("bob", "dave"));
    people.assert(triple("bob", "erin"));

    let pattern = TriplePattern::any().subject(triple("bob", "").subject);
    assert_eq!(people.matching(&pattern), vec![triple("bob", "erin")]);
}

#[test]
fn add_graph_rejects_existing_name() {
    let mut store = PersistentStore::new(seeded_backend());
    let err = store
        .add_graph(Graph::new(name("urn:people")))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert_eq!(store.status(&name("urn:people")), GraphStatus::PresentClean);
}

#[test]
fn added_graph_is_visible_before_flush() {
    let mut store = PersistentStore::new(seeded_backend());
    let graph = Graph::with_triples(name("urn:new"), [triple("x", "y")]);
    let handle = store.add_graph(graph).unwrap();

    assert!(handle.is_new_graph());
    assert!(store.has_graph(&name("urn:new")).unwrap());
    assert_eq!(store.status(&name("urn:new")), GraphStatus::PendingAddition);
    let fetched = store.graph(&name("urn:new")).unwrap();
    assert!(fetched.ptr_eq(&handle));
    assert!(!store.backend().contains_graph(&name("urn:new")));
}

#[test]
fn merge_graph_asserts_into_existing_graph() {
    let mut store = PersistentStore::new(seeded_backend());
    let merged = store
        .merge_graph(Graph::with_triples(
            name("urn:people"),
            [triple("alice", "carol"), triple("erin", "frank")],
        ))
        .unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.pending_additions().len(), 1);
    assert_eq!(store.status(&name("urn:people")), GraphStatus::PresentDirty);

    let created = store
        .merge_graph(Graph::with_triples(name("urn:fresh"), [triple("x", "y")]))
        .unwrap();
    assert!(created.is_new_graph());
    assert_eq!(store.status(&name("urn:fresh")), GraphStatus::PendingAddition);
}

#[test]
fn removed_graph_is_hidden_immediately() {
    let mut store = PersistentStore::new(seeded_backend());
    assert!(store.remove_graph(&name("urn:places")).unwrap());
    assert!(!store.has_graph(&name("urn:places")).unwrap());
    assert_eq!(store.status(&name("urn:places")), GraphStatus::PendingRemoval);
    assert!(store.graph(&name("urn:places")).unwrap_err().is_not_found());
    assert!(store.backend().contains_graph(&name("urn:places")));

    assert!(!store.remove_graph(&name("urn:places")).unwrap());
    assert!(!store.remove_graph(&name("urn:missing")).unwrap());
}

#[test]
fn remove_after_add_cancels_and_detaches_handle() {
    let mut store = PersistentStore::new(seeded_backend());
    let handle = store
        .add_graph(Graph::with_triples(name("urn:temp"), [triple("x", "y")]))
        .unwrap();
    assert!(store.remove_graph(&name("urn:temp")).unwrap());

    assert_eq!(store.status(&name("urn:temp")), GraphStatus::Unknown);
    assert!(!handle.is_attached());
    assert!(store.is_fully_synced());
}

#[test]
fn add_after_remove_restores_graph() {
    let mut store = PersistentStore::new(seeded_backend());
    let original = store.graph(&name("urn:places")).unwrap();
    store.remove_graph(&name("urn:places")).unwrap();

    let restored = store
        .add_graph(Graph::with_triples(
            name("urn:places"),
            [triple("paris", "france")],
        ))
        .unwrap();
    assert!(restored.ptr_eq(&original));
    assert_eq!(store.status(&name("urn:places")), GraphStatus::PresentClean);
    assert!(store.is_fully_synced());
}

#[test]
fn add_after_remove_with_new_content_is_dirty() {
    let mut store = PersistentStore::new(seeded_backend());
    store.remove_graph(&name("urn:places")).unwrap();
    let restored = store
        .add_graph(Graph::with_triples(name("urn:places"), [triple("rome", "italy")]))
        .unwrap();

    assert_eq!(restored.triples(), vec![triple("rome", "italy")]);
    assert_eq!(store.status(&name("urn:places")), GraphStatus::PresentDirty);
    assert!(!restored.is_new_graph());
}

#[test]
fn graph_names_merge_backend_and_staged_state() {
    let mut store = PersistentStore::new(seeded_backend());
    store.add_graph(Graph::new(name("urn:new"))).unwrap();
    store.remove_graph(&name("urn:places")).unwrap();

    assert_eq!(
        store.graph_names().unwrap(),
        vec![name("urn:new"), name("urn:people")]
    );
}

#[test]
fn graph_names_without_listing_use_known_graphs() {
    let backend = MemoryBackend::with_capabilities(Capabilities::read_write());
    backend.insert_graph(name("urn:a"), []);
    backend.insert_graph(name("urn:b"), []);
    let mut store = PersistentStore::new(backend);
    assert!(store.graph_names().unwrap().is_empty());

    assert!(store.has_graph(&name("urn:b")).unwrap());
    store.add_graph(Graph::new(GraphName::Default)).unwrap();
    assert_eq!(
        store.graph_names().unwrap(),
        vec![GraphName::Default, name("urn:b")]
    );
    assert_eq!(store.backend().stats().lists, 0);
}

#[test]
fn existence_check_without_load_or_list_is_unsupported() {
    let backend = MemoryBackend::with_capabilities(
        Capabilities::none().with(Capability::SaveGraph),
    );
    let mut store = PersistentStore::new(backend);
    let err = store.has_graph(&name("urn:any")).unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnsupportedCapability(Capability::LoadGraph)
    ));
}
