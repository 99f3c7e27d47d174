//! Graph-level staging state.
//!
//! The registry knows, per graph name, whether the graph is present, staged
//! for addition or staged for removal. Names it has never seen are
//! `Unknown`; the first existence check probes the backend and memoizes the
//! answer. Opposite staged operations cancel each other instead of stacking.

use ahash::AHashMap;

use crate::{
    backend::{Capability, StoreBackend},
    errors::StoreError,
    graph::GraphName,
};

/// Observable registry state of one graph name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphStatus {
    PresentClean,
    PresentDirty,
    PendingAddition,
    PendingRemoval,
    Unknown,
}

impl GraphStatus {
    /// Whether a flush has work to do for this status.
    pub fn is_staged(&self) -> bool {
        matches!(
            self,
            GraphStatus::PresentDirty | GraphStatus::PendingAddition | GraphStatus::PendingRemoval
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entry {
    Present { dirty: bool },
    PendingAddition,
    PendingRemoval,
    /// Memoized negative probe; reported as `Unknown`.
    ConfirmedAbsent,
}

/// What staging an addition did to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// A staged removal was cancelled; the graph is present again.
    CancelledRemoval,
    StagedAddition,
}

/// What staging a removal did to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// A staged addition was cancelled; the entry is gone.
    CancelledAddition,
    StagedRemoval,
    /// Nothing visible carried that name.
    NotPresent,
}

/// Per-name staging state of a session.
#[derive(Debug, Default)]
pub struct GraphRegistry {
    entries: AHashMap<GraphName, Entry>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status without consulting the backend. Memoized negative
    /// probes report `Unknown`.
    pub fn status(&self, name: &GraphName) -> GraphStatus {
        match self.entries.get(name) {
            Some(Entry::Present { dirty: false }) => GraphStatus::PresentClean,
            Some(Entry::Present { dirty: true }) => GraphStatus::PresentDirty,
            Some(Entry::PendingAddition) => GraphStatus::PendingAddition,
            Some(Entry::PendingRemoval) => GraphStatus::PendingRemoval,
            Some(Entry::ConfirmedAbsent) | None => GraphStatus::Unknown,
        }
    }

    /// Visibility answer available without a probe, if any.
    pub fn cached_visibility(&self, name: &GraphName) -> Option<bool> {
        self.entries.get(name).map(|entry| match entry {
            Entry::Present { .. } | Entry::PendingAddition => true,
            Entry::PendingRemoval | Entry::ConfirmedAbsent => false,
        })
    }

    /// Whether the graph is visible in the session, probing the backend once
    /// for names never seen before.
    pub fn has(&mut self, name: &GraphName, backend: &dyn StoreBackend) -> Result<bool, StoreError> {
        if let Some(visible) = self.cached_visibility(name) {
            return Ok(visible);
        }
        let exists = probe(name, backend)?;
        tracing::debug!(graph = %name, exists, "probed backend for graph");
        self.entries.insert(
            name.clone(),
            if exists {
                Entry::Present { dirty: false }
            } else {
                Entry::ConfirmedAbsent
            },
        );
        Ok(exists)
    }

    /// Stage an addition. Callers check visibility first; a staged removal is
    /// cancelled, anything else becomes a pending addition.
    pub fn stage_add(&mut self, name: &GraphName) -> AddOutcome {
        match self.entries.get(name) {
            Some(Entry::PendingRemoval) => {
                self.entries
                    .insert(name.clone(), Entry::Present { dirty: false });
                tracing::debug!(graph = %name, "addition cancelled staged removal");
                AddOutcome::CancelledRemoval
            }
            _ => {
                self.entries.insert(name.clone(), Entry::PendingAddition);
                tracing::debug!(graph = %name, "staged graph addition");
                AddOutcome::StagedAddition
            }
        }
    }

    /// Stage a removal of a graph whose visibility is already known.
    pub fn stage_remove(&mut self, name: &GraphName) -> RemoveOutcome {
        match self.entries.get(name) {
            Some(Entry::PendingAddition) => {
                self.entries.remove(name);
                tracing::debug!(graph = %name, "removal cancelled staged addition");
                RemoveOutcome::CancelledAddition
            }
            Some(Entry::Present { .. }) => {
                self.entries.insert(name.clone(), Entry::PendingRemoval);
                tracing::debug!(graph = %name, "staged graph removal");
                RemoveOutcome::StagedRemoval
            }
            _ => RemoveOutcome::NotPresent,
        }
    }

    /// Record the graph as present in the backend, replacing any staged
    /// state. Used once a flush or discard settles the graph.
    pub fn mark_present(&mut self, name: &GraphName, dirty: bool) {
        self.entries.insert(name.clone(), Entry::Present { dirty });
    }

    /// Update the dirty flag of a present graph; other states are untouched.
    pub fn sync_dirty(&mut self, name: &GraphName, dirty: bool) {
        if let Some(Entry::Present { dirty: flag }) = self.entries.get_mut(name) {
            *flag = dirty;
        }
    }

    /// Record that the backend holds no graph of that name.
    pub fn confirm_absent(&mut self, name: &GraphName) {
        self.entries.insert(name.clone(), Entry::ConfirmedAbsent);
    }

    /// Drop every record of the name; the next check probes again.
    pub fn forget(&mut self, name: &GraphName) {
        self.entries.remove(name);
    }

    /// Names currently in `status`, sorted. `Unknown` covers only memoized
    /// negative probes.
    pub fn names_with(&self, status: GraphStatus) -> Vec<GraphName> {
        let mut names: Vec<GraphName> = self
            .entries
            .keys()
            .filter(|name| self.status(name) == status)
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Names visible without a probe (present or pending addition), sorted.
    pub fn known_visible(&self) -> Vec<GraphName> {
        let mut names: Vec<GraphName> = self
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Present { .. } | Entry::PendingAddition))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Graphs staged for creation.
    pub fn pending_addition_count(&self) -> usize {
        self.count(|entry| matches!(entry, Entry::PendingAddition))
    }

    /// Graphs staged for deletion.
    pub fn pending_removal_count(&self) -> usize {
        self.count(|entry| matches!(entry, Entry::PendingRemoval))
    }

    /// Present graphs whose recorded dirty flag is set. Proxies update the
    /// flag through [`sync_dirty`](Self::sync_dirty).
    pub fn dirty_count(&self) -> usize {
        self.count(|entry| matches!(entry, Entry::Present { dirty: true }))
    }

    fn count(&self, predicate: impl Fn(&Entry) -> bool) -> usize {
        self.entries.values().filter(|entry| predicate(entry)).count()
    }

    /// Drop memoized probe results so the next check asks the backend again.
    /// Staged entries and names for which `keep` returns true survive.
    pub fn invalidate_probes(&mut self, keep: impl Fn(&GraphName) -> bool) {
        self.entries.retain(|name, entry| match entry {
            Entry::ConfirmedAbsent => false,
            Entry::Present { dirty: false } => keep(name),
            _ => true,
        });
    }
}

fn probe(name: &GraphName, backend: &dyn StoreBackend) -> Result<bool, StoreError> {
    let caps = backend.capabilities();
    if caps.supports(Capability::ListGraphs) {
        Ok(backend.list_graph_names()?.contains(name))
    } else if caps.supports(Capability::LoadGraph) {
        backend.has_graph(name)
    } else {
        Err(StoreError::unsupported(Capability::LoadGraph))
    }
}
