//! The persistent store session.
//!
//! A [`PersistentStore`] stages graph edits, graph additions and graph
//! removals in memory and pushes them to its backend only on
//! [`flush`](PersistentStore::flush). Reads always see the staged view.
//! Graphs are materialized lazily: nothing is loaded until a caller asks for
//! a graph by name.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    backend::{Capability, StoreBackend},
    config::SessionOptions,
    coordinator::{DiscardReport, FlushReport, TransactionCoordinator},
    errors::StoreError,
    gate::{BackendQueryEngine, QueryEngine},
    graph::{Graph, GraphName},
    proxy::{GraphHandle, GraphProxy},
    registry::{AddOutcome, GraphRegistry, GraphStatus, RemoveOutcome},
};

/// Exclusive ownership of a backend for the lifetime of one session.
///
/// The backend's `close` runs exactly once: on [`release`](Self::release) or,
/// failing that, when the lease is dropped.
pub struct BackendLease<B: StoreBackend> {
    backend: B,
    released: bool,
}

impl<B: StoreBackend> BackendLease<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            released: false,
        }
    }

    pub fn get(&self) -> &B {
        &self.backend
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Close the backend. Later calls are no-ops.
    pub fn release(&mut self) -> Result<(), StoreError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.backend.close()
    }
}

impl<B: StoreBackend> Drop for BackendLease<B> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "backend close failed while dropping session");
        }
    }
}

pub struct PersistentStore<B: StoreBackend> {
    lease: BackendLease<B>,
    registry: GraphRegistry,
    proxies: BTreeMap<GraphName, GraphHandle>,
    options: SessionOptions,
    engine: Box<dyn QueryEngine>,
}

impl<B: StoreBackend> PersistentStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, SessionOptions::default())
    }

    pub fn with_options(backend: B, options: SessionOptions) -> Self {
        Self {
            lease: BackendLease::new(backend),
            registry: GraphRegistry::new(),
            proxies: BTreeMap::new(),
            options,
            engine: Box::new(BackendQueryEngine),
        }
    }

    /// Route [`execute_query`](Self::execute_query) through a custom engine.
    pub fn with_query_engine(mut self, engine: impl QueryEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn backend(&self) -> &B {
        self.lease.get()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub(crate) fn backend_dyn(&self) -> &dyn StoreBackend {
        self.lease.get()
    }

    pub(crate) fn engine(&self) -> &dyn QueryEngine {
        self.engine.as_ref()
    }

    pub(crate) fn registry(&self) -> &GraphRegistry {
        &self.registry
    }

    pub(crate) fn proxies(&self) -> &BTreeMap<GraphName, GraphHandle> {
        &self.proxies
    }

    /// Backend-side state changed behind the session's back; forget probe
    /// answers that no live proxy depends on.
    pub(crate) fn invalidate_probes(&mut self) {
        let proxies = &self.proxies;
        self.registry
            .invalidate_probes(|name| proxies.contains_key(name));
    }

    /// Whether a graph is visible in the session. The first check for a name
    /// never seen before asks the backend; the answer is remembered.
    pub fn has_graph(&mut self, name: &GraphName) -> Result<bool, StoreError> {
        let backend: &dyn StoreBackend = self.lease.get();
        self.registry.has(name, backend)
    }

    pub fn status(&self, name: &GraphName) -> GraphStatus {
        let status = self.registry.status(name);
        let dirty = self.proxies.get(name).is_some_and(GraphHandle::is_dirty);
        match status {
            GraphStatus::PresentClean if dirty => GraphStatus::PresentDirty,
            GraphStatus::PresentDirty if !dirty => GraphStatus::PresentClean,
            other => other,
        }
    }

    /// Fetch a visible graph, loading it from the backend on first access.
    pub fn graph(&mut self, name: &GraphName) -> Result<GraphHandle, StoreError> {
        if !self.has_graph(name)? {
            return Err(StoreError::not_found(name.to_string()));
        }
        self.materialize(name)
    }

    fn materialize(&mut self, name: &GraphName) -> Result<GraphHandle, StoreError> {
        if let Some(handle) = self.proxies.get(name) {
            return Ok(handle.clone());
        }
        let baseline = self.lease.get().load_graph(name)?;
        tracing::debug!(graph = %name, triples = baseline.len(), "materialized graph");
        let handle = GraphHandle::new(GraphProxy::from_baseline(name.clone(), baseline));
        self.proxies.insert(name.clone(), handle.clone());
        Ok(handle)
    }

    /// Stage a new graph. Adding a graph that is staged for removal cancels
    /// the removal and makes `graph`'s triples the graph's content.
    pub fn add_graph(&mut self, graph: Graph) -> Result<GraphHandle, StoreError> {
        let name = graph.name().clone();
        if self.has_graph(&name)? {
            return Err(StoreError::invalid_input(format!(
                "graph {name} already exists"
            )));
        }
        let content: BTreeSet<_> = graph.into_triples();
        let handle = if self.registry.status(&name) == GraphStatus::PendingRemoval {
            let handle = self.materialize(&name)?;
            handle.with_proxy(|proxy| proxy.replace_visible(content));
            handle
        } else {
            if let Some(stale) = self.proxies.remove(&name) {
                stale.with_proxy(GraphProxy::detach);
            }
            let handle = GraphHandle::new(GraphProxy::new_graph(name.clone(), content));
            self.proxies.insert(name.clone(), handle.clone());
            handle
        };
        if self.registry.stage_add(&name) == AddOutcome::CancelledRemoval {
            self.registry.sync_dirty(&name, handle.is_dirty());
        }
        Ok(handle)
    }

    /// Assert `graph`'s triples into the visible graph of the same name,
    /// staging an addition when no such graph exists.
    pub fn merge_graph(&mut self, graph: Graph) -> Result<GraphHandle, StoreError> {
        if !self.has_graph(graph.name())? {
            return self.add_graph(graph);
        }
        let handle = self.materialize(graph.name())?;
        handle.assert_all(graph.into_triples());
        self.registry.sync_dirty(&handle.name(), handle.is_dirty());
        Ok(handle)
    }

    /// Stage removal of a visible graph. Returns false when no visible graph
    /// has that name.
    pub fn remove_graph(&mut self, name: &GraphName) -> Result<bool, StoreError> {
        if !self.has_graph(name)? {
            return Ok(false);
        }
        match self.registry.stage_remove(name) {
            RemoveOutcome::CancelledAddition => {
                if let Some(handle) = self.proxies.remove(name) {
                    handle.with_proxy(|proxy| {
                        proxy.rollback();
                        proxy.detach();
                    });
                }
                Ok(true)
            }
            RemoveOutcome::StagedRemoval => Ok(true),
            RemoveOutcome::NotPresent => Ok(false),
        }
    }

    /// Every graph name visible in the session, sorted.
    ///
    /// Backends that cannot list graphs contribute nothing; the result then
    /// holds only names the session already knows to be visible.
    pub fn graph_names(&self) -> Result<Vec<GraphName>, StoreError> {
        let backend = self.lease.get();
        let mut names: BTreeSet<GraphName> =
            if backend.capabilities().supports(Capability::ListGraphs) {
                backend.list_graph_names()?.into_iter().collect()
            } else {
                BTreeSet::new()
            };
        names.extend(self.registry.known_visible());
        names.retain(|name| self.registry.status(name) != GraphStatus::PendingRemoval);
        Ok(names.into_iter().collect())
    }

    /// Handles for every graph loaded into the session and still visible.
    pub fn loaded_graphs(&self) -> Vec<GraphHandle> {
        self.proxies
            .iter()
            .filter(|(name, _)| self.registry.cached_visibility(name) == Some(true))
            .map(|(_, handle)| handle.clone())
            .collect()
    }

    /// Push all staged state to the backend.
    pub fn flush(&mut self) -> Result<FlushReport, StoreError> {
        let backend: &dyn StoreBackend = self.lease.get();
        TransactionCoordinator::new(
            backend,
            &mut self.registry,
            &mut self.proxies,
            &self.options,
        )
        .flush()
    }

    /// Drop all staged state, restoring the view last synchronized with the
    /// backend.
    pub fn discard(&mut self) -> Result<DiscardReport, StoreError> {
        let backend: &dyn StoreBackend = self.lease.get();
        TransactionCoordinator::new(
            backend,
            &mut self.registry,
            &mut self.proxies,
            &self.options,
        )
        .discard()
    }

    /// Close the backend, surfacing its error. Staged state is dropped, not
    /// flushed.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.warn_if_unsynced();
        self.lease.release()
    }

    fn warn_if_unsynced(&self) {
        if !self.lease.is_released() && !self.is_fully_synced() {
            let state = self.sync_state();
            tracing::warn!(
                pending_additions = state.pending_additions,
                pending_removals = state.pending_removals,
                dirty_graphs = state.dirty_graphs,
                "closing session with unflushed changes; they are discarded"
            );
        }
    }
}

impl<B: StoreBackend> Drop for PersistentStore<B> {
    fn drop(&mut self) {
        self.warn_if_unsynced();
    }
}
