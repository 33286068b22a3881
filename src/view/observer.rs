//! Change detection over a view or the main graph.
//!
//! An observer remembers the `(node, edge)` version pair it last saw.
//! `has_changed()` compares by equality only, so counter wraparound is
//! harmless. In diff mode the observer also keeps a membership snapshot and
//! computes the delta at the moment a change is detected.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use hashbrown::HashSet;
use parking_lot::Mutex;
use tracing::debug;

use super::{Version, View};
use crate::graph::GraphShared;
use crate::model::{Edge, Node};
use crate::{Error, Result};

// ============================================================================
// Snapshots and diffs
// ============================================================================

/// Membership at one point in time.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub nodes: HashSet<Node>,
    pub edges: HashSet<Edge>,
}

/// Membership delta between two observations, each list sorted by element id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDiff {
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<Node>,
    pub added_edges: Vec<Edge>,
    pub removed_edges: Vec<Edge>,
}

impl GraphDiff {
    pub(crate) fn between(before: &Snapshot, after: &Snapshot) -> Self {
        let mut diff = Self {
            added_nodes: after.nodes.difference(&before.nodes).cloned().collect(),
            removed_nodes: before.nodes.difference(&after.nodes).cloned().collect(),
            added_edges: after.edges.difference(&before.edges).cloned().collect(),
            removed_edges: before.edges.difference(&after.edges).cloned().collect(),
        };
        diff.added_nodes.sort_by(|a, b| a.id().cmp(b.id()));
        diff.removed_nodes.sort_by(|a, b| a.id().cmp(b.id()));
        diff.added_edges.sort_by(|a, b| a.id().cmp(b.id()));
        diff.removed_edges.sort_by(|a, b| a.id().cmp(b.id()));
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

// ============================================================================
// GraphObserver
// ============================================================================

/// Polls a view (or the main graph) for structural changes.
///
/// Cheap to clone; clones share state. Created by
/// [`crate::Graph::create_observer`].
#[derive(Clone)]
pub struct GraphObserver {
    inner: Arc<ObserverInner>,
}

struct ObserverInner {
    graph: Weak<GraphShared>,
    view: Option<View>,
    diff_enabled: bool,
    destroyed: AtomicBool,
    state: Mutex<ObserverState>,
}

struct ObserverState {
    last: Version,
    snapshot: Snapshot,
    /// Set by a positive `has_changed()`, taken by `diff()`.
    pending: Option<GraphDiff>,
}

impl GraphObserver {
    pub(crate) fn new(
        graph: Weak<GraphShared>,
        view: Option<View>,
        diff_enabled: bool,
        version: Version,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                graph,
                view,
                diff_enabled,
                destroyed: AtomicBool::new(false),
                state: Mutex::new(ObserverState { last: version, snapshot, pending: None }),
            }),
        }
    }

    /// The observed view; `None` for the main graph.
    pub fn view(&self) -> Option<&View> {
        self.inner.view.as_ref()
    }

    pub fn is_diff_enabled(&self) -> bool {
        self.inner.diff_enabled
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    fn live_graph(&self) -> Result<Arc<GraphShared>> {
        if self.is_destroyed() {
            return Err(Error::Usage("observer is destroyed".into()));
        }
        self.inner
            .graph
            .upgrade()
            .ok_or_else(|| Error::Usage("observed graph no longer exists".into()))
    }

    /// True once per batch of structural changes since the last positive call.
    pub fn has_changed(&self) -> Result<bool> {
        let shared = self.live_graph()?;
        let _hold = shared.lock.read();
        let store = shared.store.read_recursive();
        let current = store.version_of(self.inner.view.as_ref())?;

        let mut state = self.inner.state.lock();
        if current == state.last {
            state.pending = None;
            return Ok(false);
        }
        state.last = current;
        if self.inner.diff_enabled {
            let now = store.snapshot(self.inner.view.as_ref())?;
            state.pending = Some(GraphDiff::between(&state.snapshot, &now));
            state.snapshot = now;
        }
        Ok(true)
    }

    /// Delta computed by the immediately preceding positive `has_changed()`.
    pub fn diff(&self) -> Result<GraphDiff> {
        if self.is_destroyed() {
            return Err(Error::Usage("observer is destroyed".into()));
        }
        if !self.inner.diff_enabled {
            return Err(Error::Usage("observer was created without diff support".into()));
        }
        self.inner
            .state
            .lock()
            .pending
            .take()
            .ok_or_else(|| Error::Usage("diff() requires a preceding has_changed() == true".into()))
    }

    /// Detach from the observed graph. A second call is a usage error.
    pub fn destroy(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::Usage("observer is already destroyed".into()));
        }
        if let Some(shared) = self.inner.graph.upgrade() {
            let _hold = shared.lock.write()?;
            shared.store.write().detach_observer(self);
        }
        self.mark_destroyed();
        Ok(())
    }

    pub(crate) fn mark_destroyed(&self) {
        if !self.inner.destroyed.swap(true, Ordering::AcqRel) {
            debug!(view = self.inner.view.as_ref().map(View::store_id), "observer.destroy");
        }
    }

    pub(crate) fn same(&self, other: &GraphObserver) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for GraphObserver {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for GraphObserver {}

impl fmt::Debug for GraphObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphObserver")
            .field("view", &self.inner.view)
            .field("diff_enabled", &self.inner.diff_enabled)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Graph, Node};

    #[test]
    fn test_one_shot_across_wraparound() {
        let graph = Graph::new();
        graph.shared.store.write().version.node = i32::MAX;
        let obs = graph.create_observer(false).unwrap();
        assert!(!obs.has_changed().unwrap());

        graph.add_node(&Node::new("a")).unwrap();
        assert_eq!(graph.shared.store.read().version.node, i32::MIN);
        assert!(obs.has_changed().unwrap());
        assert!(!obs.has_changed().unwrap());
    }

    #[test]
    fn test_diff_requires_positive_poll() {
        let graph = Graph::new();
        let obs = graph.create_observer(true).unwrap();
        assert!(matches!(obs.diff(), Err(Error::Usage(_))));

        let a = Node::new("a");
        graph.add_node(&a).unwrap();
        assert!(obs.has_changed().unwrap());
        let diff = obs.diff().unwrap();
        assert_eq!(diff.added_nodes, vec![a]);
        assert!(matches!(obs.diff(), Err(Error::Usage(_))), "diff is taken once");
    }

    #[test]
    fn test_diff_disabled() {
        let graph = Graph::new();
        let obs = graph.create_observer(false).unwrap();
        graph.add_node(&Node::new(1)).unwrap();
        assert!(obs.has_changed().unwrap());
        assert!(matches!(obs.diff(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_destroy_twice() {
        let graph = Graph::new();
        let obs = graph.create_observer(false).unwrap();
        obs.destroy().unwrap();
        assert!(obs.is_destroyed());
        assert!(matches!(obs.destroy(), Err(Error::Usage(_))));
        assert!(matches!(obs.has_changed(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_graph_dropped() {
        let graph = Graph::new();
        let obs = graph.create_observer(false).unwrap();
        drop(graph);
        assert!(matches!(obs.has_changed(), Err(Error::Usage(_))));
        obs.destroy().unwrap();
    }
}
