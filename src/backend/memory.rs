//! In-process reference backend.
//!
//! Keeps graphs in a lock-guarded map, honours a configurable capability
//! mask, counts every call it receives and can be told to fail on demand.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use super::{Capabilities, Capability, StoreBackend};
use crate::{
    errors::StoreError,
    fault_injection::{FaultPlan, FaultPoint},
    graph::GraphName,
    triple::Triple,
};

/// Per-operation call counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub loads: u64,
    pub saves: u64,
    pub updates: u64,
    pub deletes: u64,
    pub lists: u64,
    pub probes: u64,
    pub closes: u64,
}

impl BackendStats {
    /// Calls that touch graph data or metadata, excluding `close`.
    pub fn data_calls(&self) -> u64 {
        self.loads + self.saves + self.updates + self.deletes + self.lists + self.probes
    }

    pub fn writes(&self) -> u64 {
        self.saves + self.updates + self.deletes
    }
}

#[derive(Default)]
struct Counters {
    loads: AtomicU64,
    saves: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    lists: AtomicU64,
    probes: AtomicU64,
    closes: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub struct MemoryBackend {
    graphs: RwLock<AHashMap<GraphName, BTreeSet<Triple>>>,
    capabilities: Capabilities,
    counters: Counters,
    faults: FaultPlan,
}

impl MemoryBackend {
    /// Backend advertising every graph-level capability; query and update
    /// execution are not available in memory.
    pub fn new() -> Self {
        Self::with_capabilities(
            Capabilities::all()
                .without(Capability::Query)
                .without(Capability::Update),
        )
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            graphs: RwLock::new(AHashMap::new()),
            capabilities,
            counters: Counters::default(),
            faults: FaultPlan::new(),
        }
    }

    /// Seed a graph directly, bypassing counters, faults and capabilities.
    pub fn insert_graph(&self, name: GraphName, triples: impl IntoIterator<Item = Triple>) {
        self.graphs.write().insert(name, triples.into_iter().collect());
    }

    /// Inspect stored content without counting a call.
    pub fn snapshot(&self, name: &GraphName) -> Option<BTreeSet<Triple>> {
        self.graphs.read().get(name).cloned()
    }

    pub fn contains_graph(&self, name: &GraphName) -> bool {
        self.graphs.read().contains_key(name)
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.read().len()
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    pub fn stats(&self) -> BackendStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        BackendStats {
            loads: load(&self.counters.loads),
            saves: load(&self.counters.saves),
            updates: load(&self.counters.updates),
            deletes: load(&self.counters.deletes),
            lists: load(&self.counters.lists),
            probes: load(&self.counters.probes),
            closes: load(&self.counters.closes),
        }
    }

    fn require(&self, capability: Capability) -> Result<(), StoreError> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(StoreError::unsupported(capability))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for MemoryBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn load_graph(&self, name: &GraphName) -> Result<BTreeSet<Triple>, StoreError> {
        bump(&self.counters.loads);
        self.require(Capability::LoadGraph)?;
        self.faults.check(FaultPoint::LoadGraph)?;
        self.graphs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name.to_string()))
    }

    fn save_graph(&self, name: &GraphName, triples: &BTreeSet<Triple>) -> Result<(), StoreError> {
        bump(&self.counters.saves);
        self.require(Capability::SaveGraph)?;
        self.faults.check(FaultPoint::SaveGraph)?;
        self.graphs.write().insert(name.clone(), triples.clone());
        Ok(())
    }

    fn update_graph(
        &self,
        name: &GraphName,
        additions: &BTreeSet<Triple>,
        removals: &BTreeSet<Triple>,
    ) -> Result<(), StoreError> {
        bump(&self.counters.updates);
        self.require(Capability::UpdateGraph)?;
        self.faults.check(FaultPoint::UpdateGraph)?;
        let mut graphs = self.graphs.write();
        let stored = graphs.entry(name.clone()).or_default();
        for triple in removals {
            stored.remove(triple);
        }
        stored.extend(additions.iter().cloned());
        Ok(())
    }

    fn delete_graph(&self, name: &GraphName) -> Result<(), StoreError> {
        bump(&self.counters.deletes);
        self.require(Capability::DeleteGraph)?;
        self.faults.check(FaultPoint::DeleteGraph)?;
        self.graphs.write().remove(name);
        Ok(())
    }

    fn list_graph_names(&self) -> Result<Vec<GraphName>, StoreError> {
        bump(&self.counters.lists);
        self.require(Capability::ListGraphs)?;
        self.faults.check(FaultPoint::ListGraphs)?;
        let mut names: Vec<GraphName> = self.graphs.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn has_graph(&self, name: &GraphName) -> Result<bool, StoreError> {
        bump(&self.counters.probes);
        self.require(Capability::LoadGraph)?;
        self.faults.check(FaultPoint::LoadGraph)?;
        Ok(self.graphs.read().contains_key(name))
    }

    fn close(&self) -> Result<(), StoreError> {
        bump(&self.counters.closes);
        self.faults.check(FaultPoint::Close)
    }
}
