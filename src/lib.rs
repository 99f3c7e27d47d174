//! Transactional staging layer over named-graph triple stores.
//!
//! graphstage keeps an in-memory working view of a set of named graphs that
//! live in a pluggable backend. Edits to triples, new graphs and graph
//! removals are staged in the session and reach the backend only when the
//! session is flushed; discarding drops them and restores the last
//! synchronized view.
//!
//! # Features
//!
//! - **Lazy loading**: a graph is read from the backend on first access and
//!   existence checks are remembered
//! - **Per-graph overlays**: each loaded graph tracks pending additions and
//!   removals against its baseline; opposite edits cancel
//! - **Ordered flush**: deletions, then creations, then edits, each graph
//!   committed as soon as its backend call succeeds so retries are cheap
//! - **Capability-aware**: backends advertise what they support and the
//!   session picks incremental updates or whole-graph rewrites accordingly
//! - **Query gate**: backend queries are refused while anything is unflushed
//!
//! # Quick Start
//!
//! ```rust
//! use graphstage::{Graph, GraphName, MemoryBackend, Node, PersistentStore, Triple};
//!
//! let mut store = PersistentStore::new(MemoryBackend::new());
//! let name = GraphName::named("http://example.org/people");
//! let people = store.add_graph(Graph::new(name.clone()))?;
//! people.assert(Triple::new(
//!     Node::iri("http://example.org/alice"),
//!     Node::iri("http://xmlns.com/foaf/0.1/name"),
//!     Node::literal("Alice"),
//! ));
//! assert!(!store.is_fully_synced());
//!
//! store.flush()?;
//! assert!(store.is_fully_synced());
//! assert_eq!(store.backend().snapshot(&name).map(|t| t.len()), Some(1));
//! # Ok::<(), graphstage::StoreError>(())
//! ```
//!
//! # Public API Organization
//!
//! ## Values
//! - [`Node`], [`Triple`], [`Graph`], [`GraphName`], [`TriplePattern`]
//!
//! ## Session
//! - [`PersistentStore`] - staged view over one backend
//! - [`GraphHandle`] - shared handle to a loaded graph's overlay
//! - [`GraphStatus`], [`FlushReport`], [`DiscardReport`], [`SyncState`]
//!
//! ## Backends
//! - [`StoreBackend`] - capability interface
//! - [`MemoryBackend`], [`SqliteTripleBackend`] - reference implementations
//!
//! ## Configuration
//! - [`StoreConfig`], [`BackendKind`], [`SqliteConfig`], [`SessionOptions`]
//! - [`open_backend()`], [`open_store()`]
//!
//! ## Utilities
//! - [`StoreError`]
//! - [`recovery`] - JSON-lines dump and restore

pub mod backend;
pub mod config;
pub mod errors;
pub mod fault_injection;
pub mod graph;
pub mod recovery;
pub mod schema;
pub mod triple;

mod coordinator;
mod gate;
mod proxy;
mod registry;
mod store;

pub use backend::{
    BackendStats, Capabilities, Capability, MemoryBackend, QueryResult, ResultSet,
    SqliteTripleBackend, StoreBackend,
};
pub use config::{BackendKind, SessionOptions, SqliteConfig, StoreConfig, open_backend, open_store};
pub use coordinator::{DiscardReport, FlushReport, TransactionCoordinator};
pub use errors::StoreError;
pub use fault_injection::{FaultPlan, FaultPoint};
pub use gate::{BackendQueryEngine, QueryEngine, SyncState};
pub use graph::{Graph, GraphName, TriplePattern};
pub use proxy::{GraphHandle, GraphProxy};
pub use recovery::{
    dump_store_to_path, dump_store_to_writer, restore_backend_from_path,
    restore_backend_from_reader,
};
pub use registry::{AddOutcome, GraphRegistry, GraphStatus, RemoveOutcome};
pub use store::{BackendLease, PersistentStore};
pub use triple::{Node, Triple};
