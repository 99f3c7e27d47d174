//! Per-graph overlay.
//!
//! A [`GraphProxy`] holds the baseline last synchronized with the backend plus
//! two pending sets. The visible triple set is always
//! `(baseline ∪ pending_adds) \ pending_removes` and every read goes through
//! it. The pending sets stay disjoint, `pending_adds` never overlaps the
//! baseline and `pending_removes` is always a subset of it.
//!
//! Callers share proxies through [`GraphHandle`]. Handles are `!Send`: a
//! session and its graphs belong to one thread of control.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::{
    graph::{Graph, GraphName, TriplePattern},
    triple::Triple,
};

/// Staged view of one graph: a baseline plus pending additions and removals.
#[derive(Debug)]
pub struct GraphProxy {
    name: GraphName,
    baseline: BTreeSet<Triple>,
    pending_adds: BTreeSet<Triple>,
    pending_removes: BTreeSet<Triple>,
    is_new: bool,
    attached: bool,
}

impl GraphProxy {
    /// Proxy over content already present in the backend.
    pub fn from_baseline(name: GraphName, baseline: BTreeSet<Triple>) -> Self {
        Self {
            name,
            baseline,
            pending_adds: BTreeSet::new(),
            pending_removes: BTreeSet::new(),
            is_new: false,
            attached: true,
        }
    }

    /// Proxy for a graph created in-session: empty baseline, content pending.
    pub fn new_graph(name: GraphName, content: BTreeSet<Triple>) -> Self {
        Self {
            name,
            baseline: BTreeSet::new(),
            pending_adds: content,
            pending_removes: BTreeSet::new(),
            is_new: true,
            attached: true,
        }
    }

    pub fn name(&self) -> &GraphName {
        &self.name
    }

    /// Content as of the last load, flush or discard.
    pub fn baseline(&self) -> &BTreeSet<Triple> {
        &self.baseline
    }

    /// Visible triples missing from the baseline.
    pub fn pending_adds(&self) -> &BTreeSet<Triple> {
        &self.pending_adds
    }

    /// Baseline triples hidden from the visible set.
    pub fn pending_removes(&self) -> &BTreeSet<Triple> {
        &self.pending_removes
    }

    /// True until the graph has been created in the backend.
    pub fn is_new_graph(&self) -> bool {
        self.is_new
    }

    /// Whether any edit is staged.
    pub fn is_dirty(&self) -> bool {
        !self.pending_adds.is_empty() || !self.pending_removes.is_empty()
    }

    /// Returns true when the triple was not visible before.
    pub fn assert(&mut self, triple: Triple) -> bool {
        if self.pending_removes.remove(&triple) {
            return true;
        }
        if self.baseline.contains(&triple) {
            return false;
        }
        self.pending_adds.insert(triple)
    }

    /// Returns true when the triple was visible before.
    pub fn retract(&mut self, triple: &Triple) -> bool {
        if self.pending_adds.remove(triple) {
            return true;
        }
        if self.baseline.contains(triple) {
            return self.pending_removes.insert(triple.clone());
        }
        false
    }

    /// Membership in the visible set.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.pending_adds.contains(triple)
            || (self.baseline.contains(triple) && !self.pending_removes.contains(triple))
    }

    pub fn len(&self) -> usize {
        self.baseline.len() + self.pending_adds.len() - self.pending_removes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visible triples: baseline survivors first, then pending additions.
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.baseline
            .iter()
            .filter(|t| !self.pending_removes.contains(*t))
            .chain(self.pending_adds.iter())
    }

    pub fn visible(&self) -> BTreeSet<Triple> {
        self.iter().cloned().collect()
    }

    /// Make `content` the visible set, expressed as pending edits against
    /// the current baseline.
    pub fn replace_visible(&mut self, content: BTreeSet<Triple>) {
        self.pending_removes = self.baseline.difference(&content).cloned().collect();
        self.pending_adds = content
            .into_iter()
            .filter(|t| !self.baseline.contains(t))
            .collect();
    }

    /// The pending edits reached the backend: fold them into the baseline.
    pub fn commit(&mut self) {
        for triple in std::mem::take(&mut self.pending_removes) {
            self.baseline.remove(&triple);
        }
        self.baseline.append(&mut self.pending_adds);
        self.is_new = false;
    }

    /// Drop pending edits, restoring the baseline view.
    pub fn rollback(&mut self) {
        self.pending_adds.clear();
        self.pending_removes.clear();
    }

    /// Install a freshly loaded baseline and drop pending edits.
    pub fn reset_baseline(&mut self, baseline: BTreeSet<Triple>) {
        self.baseline = baseline;
        self.is_new = false;
        self.rollback();
    }

    /// Stop tracking the graph in its session.
    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }
}

/// Shared handle to a graph's overlay.
///
/// Clones refer to the same proxy. Mutations never contact the backend; they
/// are staged until the owning session flushes or discards.
#[derive(Clone, Debug)]
pub struct GraphHandle {
    inner: Rc<RefCell<GraphProxy>>,
}

impl GraphHandle {
    pub(crate) fn new(proxy: GraphProxy) -> Self {
        Self {
            inner: Rc::new(RefCell::new(proxy)),
        }
    }

    pub(crate) fn proxy(&self) -> Ref<'_, GraphProxy> {
        self.inner.borrow()
    }

    pub(crate) fn with_proxy<T>(&self, f: impl FnOnce(&mut GraphProxy) -> T) -> T {
        f(&mut self.inner.borrow_mut())
    }

    pub fn name(&self) -> GraphName {
        self.inner.borrow().name.clone()
    }

    /// Stage an assertion. Returns true when the triple was not visible.
    pub fn assert(&self, triple: Triple) -> bool {
        self.with_proxy(|proxy| proxy.assert(triple))
    }

    /// Returns the number of triples that became visible.
    pub fn assert_all(&self, triples: impl IntoIterator<Item = Triple>) -> usize {
        self.with_proxy(|proxy| triples.into_iter().filter(|t| proxy.assert(t.clone())).count())
    }

    /// Stage a retraction. Returns true when the triple was visible.
    pub fn retract(&self, triple: &Triple) -> bool {
        self.with_proxy(|proxy| proxy.retract(triple))
    }

    /// Returns the number of triples that stopped being visible.
    pub fn retract_all<'a>(&self, triples: impl IntoIterator<Item = &'a Triple>) -> usize {
        self.with_proxy(|proxy| triples.into_iter().filter(|t| proxy.retract(t)).count())
    }

    /// Retract every visible triple matching the pattern.
    pub fn retract_matching(&self, pattern: &TriplePattern) -> usize {
        let doomed = self.matching(pattern);
        self.retract_all(doomed.iter())
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.inner.borrow().contains(triple)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Visible triples in sorted order.
    pub fn triples(&self) -> Vec<Triple> {
        self.inner.borrow().visible().into_iter().collect()
    }

    /// Visible triples matching `pattern`, sorted.
    pub fn matching(&self, pattern: &TriplePattern) -> Vec<Triple> {
        let mut hits: Vec<Triple> = self
            .inner
            .borrow()
            .iter()
            .filter(|t| pattern.matches(t))
            .cloned()
            .collect();
        hits.sort();
        hits
    }

    /// Snapshot of the visible set as a detached [`Graph`].
    pub fn to_graph(&self) -> Graph {
        let proxy = self.inner.borrow();
        Graph::with_triples(proxy.name.clone(), proxy.iter().cloned())
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().is_dirty()
    }

    pub fn is_new_graph(&self) -> bool {
        self.inner.borrow().is_new
    }

    /// False once the session stopped tracking this graph; the handle then
    /// behaves as a private in-memory graph.
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }

    /// Copy of the staged additions.
    pub fn pending_additions(&self) -> BTreeSet<Triple> {
        self.inner.borrow().pending_adds.clone()
    }

    /// Copy of the staged removals.
    pub fn pending_removals(&self) -> BTreeSet<Triple> {
        self.inner.borrow().pending_removes.clone()
    }

    /// Whether both handles share one proxy.
    pub fn ptr_eq(&self, other: &GraphHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::Node;

    fn triple(o: &str) -> Triple {
        Triple::new(Node::iri("urn:s"), Node::iri("urn:p"), Node::literal(o))
    }

    fn baseline(items: &[&str]) -> GraphProxy {
        GraphProxy::from_baseline(
            GraphName::named("urn:g"),
            items.iter().map(|o| triple(o)).collect(),
        )
    }

    #[test]
    fn test_assert_new_triple_is_pending_add() {
        let mut proxy = baseline(&["a"]);
        assert!(proxy.assert(triple("b")));
        assert!(proxy.contains(&triple("b")));
        assert_eq!(proxy.pending_adds().len(), 1);
        assert!(proxy.is_dirty());
    }

    #[test]
    fn test_assert_baseline_triple_is_noop() {
        let mut proxy = baseline(&["a"]);
        assert!(!proxy.assert(triple("a")));
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn test_retract_then_assert_cancels() {
        let mut proxy = baseline(&["a"]);
        assert!(proxy.retract(&triple("a")));
        assert!(!proxy.contains(&triple("a")));
        assert!(proxy.assert(triple("a")));
        assert!(proxy.contains(&triple("a")));
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn test_assert_then_retract_cancels_without_touching_baseline() {
        let mut proxy = baseline(&["a"]);
        proxy.assert(triple("b"));
        assert!(proxy.retract(&triple("b")));
        assert!(!proxy.is_dirty());
        assert_eq!(proxy.visible(), baseline(&["a"]).visible());
    }

    #[test]
    fn test_retract_unknown_triple_is_noop() {
        let mut proxy = baseline(&["a"]);
        assert!(!proxy.retract(&triple("zzz")));
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn test_pending_sets_stay_disjoint() {
        let mut proxy = baseline(&["a", "b"]);
        proxy.retract(&triple("a"));
        proxy.assert(triple("c"));
        proxy.assert(triple("a"));
        proxy.retract(&triple("c"));
        proxy.retract(&triple("b"));
        assert!(proxy.pending_adds().is_disjoint(proxy.pending_removes()));
        assert!(proxy.pending_adds().is_disjoint(proxy.baseline()));
        assert!(proxy.pending_removes().is_subset(proxy.baseline()));
        assert_eq!(proxy.visible(), BTreeSet::from([triple("a")]));
        assert_eq!(proxy.len(), 1);
    }

    #[test]
    fn test_commit_folds_pending_into_baseline() {
        let mut proxy = baseline(&["a", "b"]);
        proxy.retract(&triple("a"));
        proxy.assert(triple("c"));
        let visible = proxy.visible();
        proxy.commit();
        assert!(!proxy.is_dirty());
        assert_eq!(proxy.baseline(), &visible);
    }

    #[test]
    fn test_replace_visible_diffs_against_baseline() {
        let mut proxy = baseline(&["a", "b"]);
        proxy.replace_visible([triple("b"), triple("c")].into_iter().collect());
        assert_eq!(proxy.pending_adds(), &BTreeSet::from([triple("c")]));
        assert_eq!(proxy.pending_removes(), &BTreeSet::from([triple("a")]));

        proxy.replace_visible([triple("a"), triple("b")].into_iter().collect());
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn test_handle_clones_share_state() {
        let handle = GraphHandle::new(baseline(&["a"]));
        let other = handle.clone();
        other.assert(triple("b"));
        assert!(handle.contains(&triple("b")));
        assert!(handle.ptr_eq(&other));
        assert_eq!(handle.triples(), vec![triple("a"), triple("b")]);
    }

    #[test]
    fn test_handle_retract_matching() {
        let handle = GraphHandle::new(baseline(&["a", "b"]));
        handle.assert(Triple::new(
            Node::iri("urn:s"),
            Node::iri("urn:other"),
            Node::literal("c"),
        ));
        let removed = handle.retract_matching(&TriplePattern::any().predicate(Node::iri("urn:p")));
        assert_eq!(removed, 2);
        assert_eq!(handle.len(), 1);
    }
}
