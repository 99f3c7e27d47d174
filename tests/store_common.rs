use graphstage::{GraphName, MemoryBackend, Node, Triple};

pub fn name(iri: &str) -> GraphName {
    GraphName::named(iri)
}

pub fn triple(subject: &str, object: &str) -> Triple {
    Triple::new(
        Node::iri(format!("http://example.org/{subject}")),
        Node::iri("http://example.org/knows"),
        Node::literal(object),
    )
}

/// Memory backend holding `urn:people` = {alice, bob} and `urn:places` = {paris}.
pub fn seeded_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.insert_graph(
        name("urn:people"),
        [triple("alice", "carol"), triple("bob", "dave")],
    );
    backend.insert_graph(name("urn:places"), [triple("paris", "france")]);
    backend
}
