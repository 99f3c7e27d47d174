//! Flush and discard.
//!
//! Flush pushes staged state to the backend in a fixed order: graph
//! deletions, then graph additions, then edits to existing graphs. Every
//! graph's registry entry moves as soon as its own backend call succeeds, so a
//! flush that fails part-way leaves the earlier graphs clean and a retry only
//! re-attempts what is still staged.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    backend::{Capabilities, Capability, StoreBackend},
    config::SessionOptions,
    errors::StoreError,
    graph::GraphName,
    proxy::{GraphHandle, GraphProxy},
    registry::{GraphRegistry, GraphStatus},
    triple::Triple,
};

/// Backend work performed by one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub graphs_deleted: usize,
    pub graphs_created: usize,
    /// Existing graphs written through incremental updates.
    pub graphs_updated: usize,
    /// Existing graphs written through load, modify and save.
    pub graphs_rewritten: usize,
}

impl FlushReport {
    pub fn is_noop(&self) -> bool {
        *self == FlushReport::default()
    }
}

/// Staged state dropped by one discard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscardReport {
    pub additions_dropped: usize,
    pub removals_restored: usize,
    pub edits_reverted: usize,
}

/// Copy each live proxy's dirty flag into the registry.
pub(crate) fn refresh_dirty(
    registry: &mut GraphRegistry,
    proxies: &BTreeMap<GraphName, GraphHandle>,
) {
    for (name, handle) in proxies {
        registry.sync_dirty(name, handle.is_dirty());
    }
}

/// Borrowed view of a session's staging state for one flush or discard.
pub struct TransactionCoordinator<'a> {
    backend: &'a dyn StoreBackend,
    registry: &'a mut GraphRegistry,
    proxies: &'a mut BTreeMap<GraphName, GraphHandle>,
    options: &'a SessionOptions,
}

impl<'a> TransactionCoordinator<'a> {
    pub(crate) fn new(
        backend: &'a dyn StoreBackend,
        registry: &'a mut GraphRegistry,
        proxies: &'a mut BTreeMap<GraphName, GraphHandle>,
        options: &'a SessionOptions,
    ) -> Self {
        Self {
            backend,
            registry,
            proxies,
            options,
        }
    }

    pub fn flush(&mut self) -> Result<FlushReport, StoreError> {
        let span = tracing::info_span!("flush");
        let _guard = span.enter();

        refresh_dirty(self.registry, self.proxies);
        let caps = self.backend.capabilities();
        let mut report = FlushReport::default();

        for name in self.registry.names_with(GraphStatus::PendingRemoval) {
            if !caps.supports(Capability::DeleteGraph) {
                return Err(StoreError::unsupported(Capability::DeleteGraph));
            }
            self.backend.delete_graph(&name)?;
            self.registry.confirm_absent(&name);
            if let Some(handle) = self.proxies.remove(&name) {
                handle.with_proxy(GraphProxy::detach);
            }
            tracing::debug!(graph = %name, "deleted graph");
            report.graphs_deleted += 1;
        }

        for name in self.registry.names_with(GraphStatus::PendingAddition) {
            let content = match self.proxies.get(&name) {
                Some(handle) => handle.proxy().visible(),
                None => BTreeSet::new(),
            };
            self.create_graph(&name, &content, caps)?;
            if let Some(handle) = self.proxies.get(&name) {
                handle.with_proxy(GraphProxy::commit);
            }
            self.registry.mark_present(&name, false);
            tracing::debug!(graph = %name, triples = content.len(), "created graph");
            report.graphs_created += 1;
        }

        for name in self.registry.names_with(GraphStatus::PresentDirty) {
            let Some(handle) = self.proxies.get(&name).cloned() else {
                self.registry.sync_dirty(&name, false);
                continue;
            };
            let (additions, removals) = {
                let proxy = handle.proxy();
                (proxy.pending_adds().clone(), proxy.pending_removes().clone())
            };
            if caps.supports(Capability::UpdateGraph) {
                self.backend.update_graph(&name, &additions, &removals)?;
                report.graphs_updated += 1;
            } else {
                self.rewrite_graph(&name, &additions, &removals, caps)?;
                report.graphs_rewritten += 1;
            }
            handle.with_proxy(GraphProxy::commit);
            self.registry.mark_present(&name, false);
            tracing::debug!(
                graph = %name,
                added = additions.len(),
                removed = removals.len(),
                "wrote graph edits"
            );
        }

        tracing::info!(
            deleted = report.graphs_deleted,
            created = report.graphs_created,
            updated = report.graphs_updated,
            rewritten = report.graphs_rewritten,
            "flush complete"
        );
        Ok(report)
    }

    fn create_graph(
        &self,
        name: &GraphName,
        content: &BTreeSet<Triple>,
        caps: Capabilities,
    ) -> Result<(), StoreError> {
        let can_save = caps.supports(Capability::SaveGraph);
        let can_update = caps.supports(Capability::UpdateGraph);
        if can_update && (self.options.prefer_incremental_updates || !can_save) {
            self.backend.update_graph(name, content, &BTreeSet::new())
        } else if can_save {
            self.backend.save_graph(name, content)
        } else {
            Err(StoreError::unsupported(Capability::SaveGraph))
        }
    }

    fn rewrite_graph(
        &self,
        name: &GraphName,
        additions: &BTreeSet<Triple>,
        removals: &BTreeSet<Triple>,
        caps: Capabilities,
    ) -> Result<(), StoreError> {
        for needed in [Capability::LoadGraph, Capability::SaveGraph] {
            if !caps.supports(needed) {
                return Err(StoreError::unsupported(needed));
            }
        }
        let mut current = match self.backend.load_graph(name) {
            Ok(triples) => triples,
            Err(err) if err.is_not_found() => BTreeSet::new(),
            Err(err) => return Err(err),
        };
        for triple in removals {
            current.remove(triple);
        }
        current.extend(additions.iter().cloned());
        self.backend.save_graph(name, &current)
    }

    pub fn discard(&mut self) -> Result<DiscardReport, StoreError> {
        let span = tracing::info_span!("discard");
        let _guard = span.enter();

        refresh_dirty(self.registry, self.proxies);
        let mut report = DiscardReport::default();

        for name in self.registry.names_with(GraphStatus::PendingAddition) {
            self.registry.forget(&name);
            if let Some(handle) = self.proxies.remove(&name) {
                handle.with_proxy(|proxy| {
                    proxy.rollback();
                    proxy.detach();
                });
            }
            report.additions_dropped += 1;
        }

        for name in self.registry.names_with(GraphStatus::PendingRemoval) {
            if let Some(handle) = self.proxies.get(&name) {
                // A failed reload leaves the removal staged.
                let baseline = self.backend.load_graph(&name)?;
                handle.with_proxy(|proxy| proxy.reset_baseline(baseline));
            }
            self.registry.mark_present(&name, false);
            report.removals_restored += 1;
        }

        for (name, handle) in self.proxies.iter() {
            if self.registry.status(name) == GraphStatus::PresentDirty {
                handle.with_proxy(GraphProxy::rollback);
                self.registry.sync_dirty(name, false);
                report.edits_reverted += 1;
            }
        }

        tracing::info!(
            additions_dropped = report.additions_dropped,
            removals_restored = report.removals_restored,
            edits_reverted = report.edits_reverted,
            "discard complete"
        );
        Ok(report)
    }
}
