//! Query gate.
//!
//! Queries run against backend content only, so they are refused while the
//! session holds anything unflushed. Updates go straight to the backend and
//! never touch staged state.

use crate::{
    backend::{Capability, QueryResult, StoreBackend},
    errors::StoreError,
    store::PersistentStore,
};

/// Evaluates query text against a backend.
pub trait QueryEngine {
    fn execute_query(
        &self,
        backend: &dyn StoreBackend,
        text: &str,
    ) -> Result<QueryResult, StoreError>;
}

/// Hands query text to the backend's own query capability.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackendQueryEngine;

impl QueryEngine for BackendQueryEngine {
    fn execute_query(
        &self,
        backend: &dyn StoreBackend,
        text: &str,
    ) -> Result<QueryResult, StoreError> {
        if !backend.capabilities().supports(Capability::Query) {
            return Err(StoreError::unsupported(Capability::Query));
        }
        backend.query(text)
    }
}

impl<F> QueryEngine for F
where
    F: Fn(&dyn StoreBackend, &str) -> Result<QueryResult, StoreError>,
{
    fn execute_query(
        &self,
        backend: &dyn StoreBackend,
        text: &str,
    ) -> Result<QueryResult, StoreError> {
        self(backend, text)
    }
}

/// Counts of staged state not yet pushed to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncState {
    pub pending_additions: usize,
    pub pending_removals: usize,
    pub dirty_graphs: usize,
}

impl SyncState {
    pub fn is_synced(&self) -> bool {
        *self == SyncState::default()
    }
}

impl<B: StoreBackend> PersistentStore<B> {
    pub fn sync_state(&self) -> SyncState {
        let registry = self.registry();
        SyncState {
            pending_additions: registry.pending_addition_count(),
            pending_removals: registry.pending_removal_count(),
            dirty_graphs: self
                .proxies()
                .iter()
                .filter(|(name, handle)| {
                    registry.cached_visibility(name) == Some(true)
                        && !handle.is_new_graph()
                        && handle.is_dirty()
                })
                .count(),
        }
    }

    /// True when backend content equals the session's visible view.
    pub fn is_fully_synced(&self) -> bool {
        self.sync_state().is_synced()
    }

    /// Run a read query against the backend. Refused with
    /// [`StoreError::SyncRequired`] while anything is staged; the backend is
    /// not contacted in that case.
    pub fn execute_query(&self, text: &str) -> Result<QueryResult, StoreError> {
        let state = self.sync_state();
        if !state.is_synced() {
            return Err(StoreError::sync_required(format!(
                "flush or discard first: {} pending additions, {} pending removals, {} dirty graphs",
                state.pending_additions, state.pending_removals, state.dirty_graphs
            )));
        }
        self.engine().execute_query(self.backend_dyn(), text)
    }

    /// Apply an update directly to the backend, bypassing staged state.
    ///
    /// Staged edits are neither flushed nor reconciled, and graphs already
    /// loaded keep their baselines. Existence answers cached for other graphs
    /// are dropped so the update's effect on the set of graphs is observed.
    pub fn execute_update(&mut self, text: &str) -> Result<(), StoreError> {
        let backend = self.backend_dyn();
        if !backend.capabilities().supports(Capability::Update) {
            return Err(StoreError::unsupported(Capability::Update));
        }
        backend.update(text)?;
        self.invalidate_probes();
        tracing::debug!("executed backend update");
        Ok(())
    }
}
