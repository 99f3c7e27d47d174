//! Named graph values and triple patterns.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    errors::StoreError,
    triple::{IriRef, Node, Triple},
};

/// Identifier of a graph within a store.
///
/// `Default` is the unnamed default graph; it sorts before every named graph.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraphName {
    Default,
    Named(String),
}

impl GraphName {
    pub fn named(iri: impl Into<String>) -> Self {
        GraphName::Named(iri.into())
    }

    /// Storage key used by text-keyed backends: the N-Triples form of the
    /// graph IRI, or "" for the default graph. A named graph never maps to "".
    pub fn to_key(&self) -> String {
        match self {
            GraphName::Default => String::new(),
            GraphName::Named(iri) => IriRef(iri).to_string(),
        }
    }

    /// Inverse of [`to_key`](Self::to_key).
    pub fn from_key(key: &str) -> Result<Self, StoreError> {
        if key.is_empty() {
            return Ok(GraphName::Default);
        }
        match Node::parse(key)? {
            Node::Iri(iri) => Ok(GraphName::Named(iri)),
            _ => Err(StoreError::invalid_input(format!(
                "graph key is not an IRI: {key}"
            ))),
        }
    }

    pub fn as_node(&self) -> Option<Node> {
        match self {
            GraphName::Default => None,
            GraphName::Named(iri) => Some(Node::iri(iri.clone())),
        }
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphName::Default => f.write_str("default graph"),
            GraphName::Named(iri) => write!(f, "<{iri}>"),
        }
    }
}

impl From<&str> for GraphName {
    fn from(iri: &str) -> Self {
        GraphName::named(iri)
    }
}

/// A named set of triples with value equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Graph {
    name: GraphName,
    triples: BTreeSet<Triple>,
}

impl Graph {
    pub fn new(name: GraphName) -> Self {
        Self {
            name,
            triples: BTreeSet::new(),
        }
    }

    pub fn with_triples(name: GraphName, triples: impl IntoIterator<Item = Triple>) -> Self {
        Self {
            name,
            triples: triples.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &GraphName {
        &self.name
    }

    pub fn triples(&self) -> &BTreeSet<Triple> {
        &self.triples
    }

    pub fn into_triples(self) -> BTreeSet<Triple> {
        self.triples
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Returns true when the triple was not already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    pub fn matching<'a>(&'a self, pattern: &'a TriplePattern) -> impl Iterator<Item = &'a Triple> {
        self.triples.iter().filter(move |t| pattern.matches(t))
    }
}

/// Triple pattern with optional subject, predicate and object constraints.
///
/// An unset position matches any node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<Node>,
    pub predicate: Option<Node>,
    pub object: Option<Node>,
}

impl TriplePattern {
    /// Pattern matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(mut self, node: Node) -> Self {
        self.subject = Some(node);
        self
    }

    pub fn predicate(mut self, node: Node) -> Self {
        self.predicate = Some(node);
        self
    }

    pub fn object(mut self, node: Node) -> Self {
        self.object = Some(node);
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        fn position(constraint: &Option<Node>, node: &Node) -> bool {
            constraint.as_ref().is_none_or(|expected| expected == node)
        }
        position(&self.subject, &triple.subject)
            && position(&self.predicate, &triple.predicate)
            && position(&self.object, &triple.object)
    }
}
