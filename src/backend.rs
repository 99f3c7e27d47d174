//! Backend capability interface consumed by the staging layer.
//!
//! A backend stores named graphs and advertises which optional operations it
//! supports through [`Capabilities`]. Operations a backend does not advertise
//! fail with [`StoreError::UnsupportedCapability`]; they never degrade to a
//! silent no-op. Calls are synchronous and may block on I/O; timeouts and
//! retries are the backend's business.

mod memory;
mod sqlite;
mod types;

pub use memory::{BackendStats, MemoryBackend};
pub use sqlite::SqliteTripleBackend;
pub use types::{Capabilities, Capability, QueryResult, ResultSet};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{errors::StoreError, graph::GraphName, triple::Triple};

/// Storage collaborator the session stages writes against.
pub trait StoreBackend {
    fn capabilities(&self) -> Capabilities;

    /// Load every triple of a graph; fails with `NotFound` when absent.
    fn load_graph(&self, name: &GraphName) -> Result<BTreeSet<Triple>, StoreError>;

    /// Create or replace a whole graph.
    fn save_graph(&self, name: &GraphName, triples: &BTreeSet<Triple>) -> Result<(), StoreError>;

    fn update_graph(
        &self,
        _name: &GraphName,
        _additions: &BTreeSet<Triple>,
        _removals: &BTreeSet<Triple>,
    ) -> Result<(), StoreError> {
        Err(StoreError::unsupported(Capability::UpdateGraph))
    }

    fn delete_graph(&self, _name: &GraphName) -> Result<(), StoreError> {
        Err(StoreError::unsupported(Capability::DeleteGraph))
    }

    fn list_graph_names(&self) -> Result<Vec<GraphName>, StoreError> {
        Err(StoreError::unsupported(Capability::ListGraphs))
    }

    /// Existence probe. The default loads the graph and maps `NotFound` to false.
    fn has_graph(&self, name: &GraphName) -> Result<bool, StoreError> {
        match self.load_graph(name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn query(&self, _text: &str) -> Result<QueryResult, StoreError> {
        Err(StoreError::unsupported(Capability::Query))
    }

    fn update(&self, _text: &str) -> Result<(), StoreError> {
        Err(StoreError::unsupported(Capability::Update))
    }

    /// Release the underlying handle. Called exactly once per session.
    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

macro_rules! forward_store_backend {
    ($($target:ty),+ $(,)?) => {$(
        impl<B> StoreBackend for $target
        where
            B: StoreBackend + ?Sized,
        {
            fn capabilities(&self) -> Capabilities {
                (**self).capabilities()
            }

            fn load_graph(&self, name: &GraphName) -> Result<BTreeSet<Triple>, StoreError> {
                (**self).load_graph(name)
            }

            fn save_graph(
                &self,
                name: &GraphName,
                triples: &BTreeSet<Triple>,
            ) -> Result<(), StoreError> {
                (**self).save_graph(name, triples)
            }

            fn update_graph(
                &self,
                name: &GraphName,
                additions: &BTreeSet<Triple>,
                removals: &BTreeSet<Triple>,
            ) -> Result<(), StoreError> {
                (**self).update_graph(name, additions, removals)
            }

            fn delete_graph(&self, name: &GraphName) -> Result<(), StoreError> {
                (**self).delete_graph(name)
            }

            fn list_graph_names(&self) -> Result<Vec<GraphName>, StoreError> {
                (**self).list_graph_names()
            }

            fn has_graph(&self, name: &GraphName) -> Result<bool, StoreError> {
                (**self).has_graph(name)
            }

            fn query(&self, text: &str) -> Result<QueryResult, StoreError> {
                (**self).query(text)
            }

            fn update(&self, text: &str) -> Result<(), StoreError> {
                (**self).update(text)
            }

            fn close(&self) -> Result<(), StoreError> {
                (**self).close()
            }
        }
    )+};
}

forward_store_backend!(&B, Box<B>, Arc<B>);
