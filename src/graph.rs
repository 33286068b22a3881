//! # Locked facade
//!
//! [`Graph`] is the thread-shareable handle: one [`GraphLock`] plus one
//! [`GraphStore`]. Every call takes the lock for its duration: reads take a
//! read hold, mutations take the write hold. Iterators keep a read hold for
//! as long as they live and release it on drop.
//!
//! Destructive iterator calls (`remove()`) additionally require the calling
//! thread to hold the write lock:
//!
//! ```rust
//! use propgraph::{Graph, Node};
//!
//! # fn example() -> propgraph::Result<()> {
//! let graph = Graph::new();
//! for i in 0..10 {
//!     graph.add_node(&Node::new(i))?;
//! }
//!
//! let _write = graph.lock().write()?;
//! let mut nodes = graph.nodes();
//! while let Some(node) = nodes.next() {
//!     if node.store_id() % 2 == 0 {
//!         nodes.remove()?;
//!     }
//! }
//! drop(nodes);
//! assert_eq!(graph.node_count(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! Listener callbacks run while the store is held; a listener must not call
//! back into the graph that notified it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{GraphConfig, GraphKind};
use crate::index::{DefaultValueProvider, GraphListener};
use crate::lock::{GraphLock, ReadGuard};
use crate::model::{Direction, Edge, ElementId, Interval, Node, Phase, Value};
use crate::storage::{AdjacencyCursor, ArenaCursor, GraphStore};
use crate::view::observer::Snapshot;
use crate::view::{GraphObserver, Membership, Version, View};
use crate::{Error, Result, StoreId};

/// State shared by every clone of a [`Graph`].
///
/// The store's own `RwLock` only guards memory; the locking protocol is
/// [`GraphLock`]'s, and every path takes it first.
pub(crate) struct GraphShared {
    pub(crate) lock: GraphLock,
    pub(crate) store: RwLock<GraphStore>,
}

/// Shared, locked handle to an in-memory property graph.
#[derive(Clone)]
pub struct Graph {
    pub(crate) shared: Arc<GraphShared>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::from_store(GraphStore::default())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("locking", &self.shared.lock.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Mixed graph with default block sizes and locking enabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GraphConfig) -> Result<Self> {
        Ok(Self::from_store(GraphStore::new(config)?))
    }

    /// Wrap an existing store; its config decides whether locking is on.
    pub fn from_store(store: GraphStore) -> Self {
        let lock = GraphLock::with_enabled(store.config().locking);
        Self {
            shared: Arc::new(GraphShared { lock, store: RwLock::new(store) }),
        }
    }

    pub fn lock(&self) -> &GraphLock {
        &self.shared.lock
    }

    /// Read holds the calling thread has on this graph.
    pub fn read_hold_count(&self) -> u32 {
        self.shared.lock.read_hold_count()
    }

    pub fn is_write_locked_by_current_thread(&self) -> bool {
        self.shared.lock.is_write_locked_by_current_thread()
    }

    fn read<T>(&self, f: impl FnOnce(&GraphStore) -> T) -> T {
        let _hold = self.shared.lock.read();
        let store = self.shared.store.read_recursive();
        f(&store)
    }

    fn write<T>(&self, f: impl FnOnce(&mut GraphStore) -> Result<T>) -> Result<T> {
        let _hold = self.shared.lock.write()?;
        let mut store = self.shared.store.write();
        f(&mut store)
    }

    /// Run `f` against the store under a read hold.
    pub fn with_store<T>(&self, f: impl FnOnce(&GraphStore) -> T) -> T {
        self.read(f)
    }

    pub fn config(&self) -> GraphConfig {
        self.read(|s| s.config().clone())
    }

    pub fn kind(&self) -> GraphKind {
        self.read(GraphStore::kind)
    }

    pub fn version(&self) -> Version {
        self.read(GraphStore::version)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn add_node(&self, node: &Node) -> Result<bool> {
        self.write(|s| s.add_node(node))
    }

    pub fn remove_node(&self, node: &Node) -> Result<bool> {
        self.write(|s| s.remove_node(node))
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.read(|s| s.contains_node(node))
    }

    pub fn node(&self, sid: StoreId) -> Result<Option<Node>> {
        self.read(|s| s.node(sid))
    }

    pub fn node_by_id(&self, id: impl Into<ElementId>) -> Option<Node> {
        let id = id.into();
        self.read(|s| s.node_by_id(&id))
    }

    pub fn node_count(&self) -> usize {
        self.read(GraphStore::node_count)
    }

    /// Every node in arena order.
    pub fn nodes(&self) -> NodeIter<'_> {
        NodeIter::new(&self.shared, self.shared.lock.read(), None)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    pub fn add_edge(&self, edge: &Edge) -> Result<bool> {
        self.write(|s| s.add_edge(edge))
    }

    pub fn remove_edge(&self, edge: &Edge) -> Result<bool> {
        self.write(|s| s.remove_edge(edge))
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.read(|s| s.contains_edge(edge))
    }

    pub fn edge(&self, sid: StoreId) -> Result<Option<Edge>> {
        self.read(|s| s.edge(sid))
    }

    pub fn edge_by_id(&self, id: impl Into<ElementId>) -> Option<Edge> {
        let id = id.into();
        self.read(|s| s.edge_by_id(&id))
    }

    pub fn get_edge(&self, source: &Node, target: &Node, edge_type: &str) -> Result<Option<Edge>> {
        self.read(|s| s.get_edge(source, target, edge_type))
    }

    pub fn get_edge_any_type(&self, source: &Node, target: &Node) -> Result<Option<Edge>> {
        self.read(|s| s.get_edge_any_type(source, target))
    }

    pub fn has_edge(&self, source: &Node, target: &Node, edge_type: &str) -> Result<bool> {
        self.read(|s| s.has_edge(source, target, edge_type))
    }

    pub fn edge_count(&self) -> usize {
        self.read(GraphStore::edge_count)
    }

    pub fn edge_count_of_type(&self, edge_type: &str) -> usize {
        self.read(|s| s.edge_count_of_type(edge_type))
    }

    pub fn undirected_edge_count(&self) -> usize {
        self.read(GraphStore::undirected_edge_count)
    }

    pub fn mutual_edge_count(&self) -> usize {
        self.read(GraphStore::mutual_edge_count)
    }

    pub fn self_loop_count(&self) -> usize {
        self.read(GraphStore::self_loop_count)
    }

    /// Every edge in arena order.
    pub fn edges(&self) -> EdgeIter<'_> {
        let source = EdgeSource::Arena { cursor: ArenaCursor::new(), undirected: false };
        EdgeIter::new(&self.shared, self.shared.lock.read(), source, None, false)
    }

    /// Every edge, each mutual pair once.
    pub fn undirected_edges(&self) -> EdgeIter<'_> {
        let source = EdgeSource::Arena { cursor: ArenaCursor::new(), undirected: true };
        EdgeIter::new(&self.shared, self.shared.lock.read(), source, None, false)
    }

    // ========================================================================
    // Adjacency
    // ========================================================================

    /// Edges around `node`.
    ///
    /// With `undirected`, a mutual pair yields only its record whose source
    /// id is greater, and a self-loop appears once in a `Both` walk.
    pub fn adjacent_edges(
        &self,
        node: &Node,
        direction: Direction,
        edge_type: Option<&str>,
        undirected: bool,
    ) -> Result<EdgeIter<'_>> {
        let hold = self.shared.lock.read();
        let cursor = {
            let store = self.shared.store.read_recursive();
            let sid = store.nodes().resolve(node)?;
            store.adjacency_cursor(sid, direction, edge_type, undirected)
        };
        Ok(EdgeIter::new(&self.shared, hold, EdgeSource::Adjacency(cursor), None, false))
    }

    pub fn out_edges(&self, node: &Node) -> Result<EdgeIter<'_>> {
        self.adjacent_edges(node, Direction::Outgoing, None, false)
    }

    pub fn in_edges(&self, node: &Node) -> Result<EdgeIter<'_>> {
        self.adjacent_edges(node, Direction::Incoming, None, false)
    }

    /// Out-edges then in-edges; [`EdgeIter::phase`] tells them apart.
    pub fn edges_of(&self, node: &Node) -> Result<EdgeIter<'_>> {
        self.adjacent_edges(node, Direction::Both, None, false)
    }

    pub fn neighbors(&self, node: &Node, direction: Direction) -> Result<Vec<Node>> {
        self.read(|s| s.neighbors(node, direction))
    }

    pub fn out_degree(&self, node: &Node) -> Result<usize> {
        self.read(|s| s.out_degree(node))
    }

    pub fn in_degree(&self, node: &Node) -> Result<usize> {
        self.read(|s| s.in_degree(node))
    }

    pub fn degree(&self, node: &Node) -> Result<usize> {
        self.read(|s| s.degree(node))
    }

    pub fn mutual_degree(&self, node: &Node) -> Result<usize> {
        self.read(|s| s.mutual_degree(node))
    }

    pub fn undirected_degree(&self, node: &Node) -> Result<usize> {
        self.read(|s| s.undirected_degree(node))
    }

    pub fn degree_of_type(&self, node: &Node, direction: Direction, edge_type: &str) -> Result<usize> {
        self.read(|s| s.degree_of_type(node, direction, edge_type))
    }

    // ========================================================================
    // Bulk operations (one write hold each)
    // ========================================================================
    //
    // A bulk call is not all-or-nothing. It applies the single-entity
    // operation element by element and returns the first fault; elements
    // applied before it stay applied, and listeners and observers see them.
    // Other threads never see the batch half done because the write hold
    // spans the whole call.

    /// Add every node in order. Returns how many were newly stored.
    ///
    /// On a fault, the nodes before the faulting one remain stored.
    pub fn add_nodes<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        self.write(|s| s.add_nodes(nodes))
    }

    /// Remove every node in order, with their incident edges.
    ///
    /// Stops at the first fault; earlier elements stay applied.
    pub fn remove_nodes<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        self.write(|s| s.remove_nodes(nodes))
    }

    /// Add every edge in order.
    ///
    /// Stops at the first fault; earlier elements stay applied.
    pub fn add_edges<'a>(&self, edges: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
        self.write(|s| s.add_edges(edges))
    }

    /// Remove every edge in order.
    ///
    /// Stops at the first fault; earlier elements stay applied.
    pub fn remove_edges<'a>(&self, edges: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
        self.write(|s| s.remove_edges(edges))
    }

    pub fn retain_nodes<'a>(&self, keep: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        self.write(|s| s.retain_nodes(keep))
    }

    pub fn retain_edges<'a>(&self, keep: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
        self.write(|s| s.retain_edges(keep))
    }

    pub fn clear(&self) -> Result<()> {
        self.write(|s| {
            s.clear();
            Ok(())
        })
    }

    pub fn clear_edges(&self) -> Result<()> {
        self.write(|s| {
            s.clear_edges();
            Ok(())
        })
    }

    // ========================================================================
    // Edge types
    // ========================================================================

    pub fn add_edge_type(&self, label: &str) -> Result<StoreId> {
        self.write(|s| s.add_edge_type(label))
    }

    pub fn remove_edge_type(&self, label: &str) -> Result<Option<StoreId>> {
        self.write(|s| s.remove_edge_type(label))
    }

    pub fn remove_edge_type_id(&self, id: StoreId) -> Result<Option<String>> {
        self.write(|s| s.remove_edge_type_id(id))
    }

    pub fn edge_type_id(&self, label: &str) -> Option<StoreId> {
        self.read(|s| s.edge_type_id(label))
    }

    pub fn edge_type_label(&self, id: StoreId) -> Result<String> {
        self.read(|s| s.edge_type_label(id).map(str::to_owned))
    }

    pub fn edge_type_count(&self) -> usize {
        self.read(GraphStore::edge_type_count)
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn create_view(&self) -> Result<View> {
        self.write(GraphStore::create_view)
    }

    /// New view starting as a copy of `base`'s membership.
    pub fn create_view_from(&self, base: &View) -> Result<View> {
        self.write(|s| s.create_view_from(base))
    }

    pub fn create_hierarchical_view(&self) -> Result<View> {
        self.write(GraphStore::create_hierarchical_view)
    }

    /// Destroy `view` and its observers. Entities are untouched.
    pub fn destroy_view(&self, view: &View) -> Result<()> {
        self.write(|s| s.destroy_view(view))
    }

    /// View-scoped facade over `view`.
    pub fn view(&self, view: &View) -> Result<Subgraph<'_>> {
        self.read(|s| s.view(view).map(|_| ()))?;
        Ok(Subgraph { graph: self, view: view.clone() })
    }

    pub fn view_count(&self) -> usize {
        self.read(GraphStore::view_count)
    }

    /// The visible view; `None` means the main graph.
    pub fn visible_view(&self) -> Option<View> {
        self.read(GraphStore::visible_view)
    }

    pub fn set_visible_view(&self, view: Option<&View>) -> Result<()> {
        self.write(|s| s.set_visible_view(view))
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Observer of the main graph. With `diff`, [`GraphObserver::diff`] is
    /// available after each positive poll.
    pub fn create_observer(&self, diff: bool) -> Result<GraphObserver> {
        self.observe(None, diff)
    }

    pub fn create_view_observer(&self, view: &View, diff: bool) -> Result<GraphObserver> {
        self.observe(Some(view), diff)
    }

    fn observe(&self, view: Option<&View>, diff: bool) -> Result<GraphObserver> {
        self.write(|s| {
            let version = s.version_of(view)?;
            let snapshot = if diff { s.snapshot(view)? } else { Snapshot::default() };
            let observer = GraphObserver::new(Arc::downgrade(&self.shared), view.cloned(), diff, version, snapshot);
            s.attach_observer(observer.clone())?;
            Ok(observer)
        })
    }

    pub fn observer_count(&self, view: Option<&View>) -> Result<usize> {
        self.read(|s| s.observer_count(view))
    }

    // ========================================================================
    // Index hooks
    // ========================================================================

    pub fn register_listener(&self, listener: Arc<dyn GraphListener>) -> Result<()> {
        self.write(|s| {
            s.register_listener(listener);
            Ok(())
        })
    }

    pub fn unregister_listener(&self, listener: &Arc<dyn GraphListener>) -> Result<bool> {
        self.write(|s| Ok(s.unregister_listener(listener)))
    }

    pub fn listener_count(&self) -> usize {
        self.read(GraphStore::listener_count)
    }

    pub fn set_default_value_provider(&self, provider: Option<Arc<dyn DefaultValueProvider>>) -> Result<()> {
        self.write(|s| {
            s.set_default_value_provider(provider);
            Ok(())
        })
    }

    pub fn default_value(&self, key: &str) -> Option<Value> {
        self.read(|s| s.default_value(key))
    }
}

// ============================================================================
// Subgraph: view-scoped facade
// ============================================================================

/// One view of a [`Graph`]. Every call takes the graph's lock.
///
/// Iterators from a subgraph are read-only.
#[derive(Debug, Clone)]
pub struct Subgraph<'g> {
    graph: &'g Graph,
    view: View,
}

impl<'g> Subgraph<'g> {
    pub fn handle(&self) -> &View {
        &self.view
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn is_destroyed(&self) -> bool {
        self.view.is_destroyed()
    }

    pub fn is_hierarchical(&self) -> bool {
        self.view.is_hierarchical()
    }

    pub fn version(&self) -> Result<Version> {
        self.graph.read(|s| s.version_of(Some(&self.view)))
    }

    pub fn destroy(self) -> Result<()> {
        self.graph.destroy_view(&self.view)
    }

    /// Make this the graph's visible view.
    pub fn show(&self) -> Result<()> {
        self.graph.set_visible_view(Some(&self.view))
    }

    // ---- membership ------------------------------------------------------

    pub fn fill(&self) -> Result<()> {
        self.graph.write(|s| s.fill_view(&self.view))
    }

    pub fn clear(&self) -> Result<()> {
        self.graph.write(|s| s.clear_view(&self.view))
    }

    pub fn add_node(&self, node: &Node) -> Result<bool> {
        self.graph.write(|s| s.view_add_node(&self.view, node))
    }

    pub fn add_nodes<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        self.graph.write(|s| {
            let mut added = 0;
            for node in nodes {
                added += usize::from(s.view_add_node(&self.view, node)?);
            }
            Ok(added)
        })
    }

    /// `Ok(false)` unless both endpoints are already members.
    pub fn add_edge(&self, edge: &Edge) -> Result<bool> {
        self.graph.write(|s| s.view_add_edge(&self.view, edge))
    }

    pub fn remove_node(&self, node: &Node) -> Result<bool> {
        self.graph.write(|s| s.view_remove_node(&self.view, node))
    }

    pub fn remove_edge(&self, edge: &Edge) -> Result<bool> {
        self.graph.write(|s| s.view_remove_edge(&self.view, edge))
    }

    pub fn contains_node(&self, node: &Node) -> Result<bool> {
        self.graph.read(|s| s.view_contains_node(&self.view, node))
    }

    pub fn contains_edge(&self, edge: &Edge) -> Result<bool> {
        self.graph.read(|s| s.view_contains_edge(&self.view, edge))
    }

    pub fn node_count(&self) -> Result<usize> {
        self.graph.read(|s| s.view_node_count(&self.view))
    }

    pub fn edge_count(&self) -> Result<usize> {
        self.graph.read(|s| s.view_edge_count(&self.view))
    }

    pub fn nodes(&self) -> Result<NodeIter<'g>> {
        let hold = self.graph.shared.lock.read();
        self.graph.shared.store.read_recursive().view(&self.view)?;
        Ok(NodeIter::new(&self.graph.shared, hold, Some(self.view.clone())))
    }

    pub fn edges(&self) -> Result<EdgeIter<'g>> {
        let hold = self.graph.shared.lock.read();
        self.graph.shared.store.read_recursive().view(&self.view)?;
        let source = EdgeSource::Arena { cursor: ArenaCursor::new(), undirected: false };
        Ok(EdgeIter::new(&self.graph.shared, hold, source, Some(self.view.clone()), true))
    }

    /// Edges around `node` that are visible in this view.
    pub fn edges_of(&self, node: &Node, direction: Direction) -> Result<EdgeIter<'g>> {
        let hold = self.graph.shared.lock.read();
        let cursor = {
            let store = self.graph.shared.store.read_recursive();
            store.view(&self.view)?;
            let sid = store.nodes().resolve(node)?;
            store.adjacency_cursor(sid, direction, None, false)
        };
        let source = EdgeSource::Adjacency(cursor);
        Ok(EdgeIter::new(&self.graph.shared, hold, source, Some(self.view.clone()), true))
    }

    pub fn degree(&self, node: &Node, direction: Direction) -> Result<usize> {
        self.graph.read(|s| s.view_degree(&self.view, node, direction))
    }

    // ---- algebra ---------------------------------------------------------

    pub fn union(&self, other: &View) -> Result<()> {
        self.graph.write(|s| s.view_union(&self.view, other))
    }

    pub fn intersection(&self, other: &View) -> Result<()> {
        self.graph.write(|s| s.view_intersection(&self.view, other))
    }

    pub fn not(&self) -> Result<()> {
        self.graph.write(|s| s.view_not(&self.view))
    }

    // ---- interval and attributes -------------------------------------------

    pub fn set_interval(&self, interval: Option<Interval>) -> Result<()> {
        self.graph.write(|s| s.set_view_interval(&self.view, interval))
    }

    pub fn interval(&self) -> Result<Interval> {
        self.graph.read(|s| s.view_interval(&self.view))
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        self.graph.write(|s| s.set_view_attribute(&self.view, key, value))
    }

    pub fn attribute(&self, key: &str) -> Result<Option<Value>> {
        self.graph.read(|s| s.view_attribute(&self.view, key))
    }

    pub fn remove_attribute(&self, key: &str) -> Result<Option<Value>> {
        self.graph.write(|s| s.remove_view_attribute(&self.view, key))
    }

    // ---- node groups -------------------------------------------------------

    pub fn group(&self, representative: &Node, members: &[Node]) -> Result<()> {
        self.graph.write(|s| s.group(&self.view, representative, members))
    }

    pub fn ungroup(&self, representative: &Node) -> Result<bool> {
        self.graph.write(|s| s.ungroup(&self.view, representative))
    }

    pub fn collapse(&self, representative: &Node) -> Result<bool> {
        self.graph.write(|s| s.collapse(&self.view, representative))
    }

    pub fn expand(&self, representative: &Node) -> Result<bool> {
        self.graph.write(|s| s.expand(&self.view, representative))
    }

    pub fn is_collapsed(&self, node: &Node) -> Result<bool> {
        self.graph.read(|s| s.is_collapsed(&self.view, node))
    }

    pub fn is_hidden(&self, node: &Node) -> Result<bool> {
        self.graph.read(|s| s.is_hidden(&self.view, node))
    }

    pub fn parent(&self, node: &Node) -> Result<Option<Node>> {
        self.graph.read(|s| s.group_parent(&self.view, node))
    }

    pub fn children(&self, node: &Node) -> Result<Vec<Node>> {
        self.graph.read(|s| s.group_children(&self.view, node))
    }

    pub fn map_to_visible(&self, node: &Node) -> Result<Node> {
        self.graph.read(|s| s.map_to_visible(&self.view, node))
    }

    pub fn map_with_hidden(&self, node: &Node) -> Result<Vec<Node>> {
        self.graph.read(|s| s.map_with_hidden(&self.view, node))
    }

    // ---- observers ---------------------------------------------------------

    pub fn create_observer(&self, diff: bool) -> Result<GraphObserver> {
        self.graph.create_view_observer(&self.view, diff)
    }
}

// ============================================================================
// Lock-holding iterators
// ============================================================================

/// Nodes in arena order. Holds a read lock until dropped.
pub struct NodeIter<'g> {
    shared: &'g GraphShared,
    _hold: ReadGuard<'g>,
    cursor: ArenaCursor,
    filter: Option<View>,
    current: Option<Node>,
}

impl<'g> NodeIter<'g> {
    fn new(shared: &'g GraphShared, hold: ReadGuard<'g>, filter: Option<View>) -> Self {
        Self { shared, _hold: hold, cursor: ArenaCursor::new(), filter, current: None }
    }

    /// Remove the node last returned by `next()`, with its edges.
    ///
    /// The calling thread must hold the write lock. View iterators are
    /// read-only.
    pub fn remove(&mut self) -> Result<bool> {
        if self.filter.is_some() {
            return Err(Error::Usage("view iterators are read-only".into()));
        }
        self.shared.lock.check_hold_write_lock()?;
        let node = self
            .current
            .take()
            .ok_or_else(|| Error::Usage("remove() needs a preceding next()".into()))?;
        self.shared.store.write().remove_node(&node)
    }
}

impl Iterator for NodeIter<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let store = self.shared.store.read_recursive();
        loop {
            let sid = self.cursor.next_node(store.nodes())?;
            if let Some(view) = &self.filter {
                if !store.view(view).ok()?.contains_node(sid) {
                    continue;
                }
            }
            let node = store.nodes().slot(sid)?.node.clone();
            self.current = Some(node.clone());
            return Some(node);
        }
    }
}

enum EdgeSource {
    Arena { cursor: ArenaCursor, undirected: bool },
    Adjacency(AdjacencyCursor),
}

/// Edges from an arena walk or an adjacency walk. Holds a read lock until
/// dropped.
pub struct EdgeIter<'g> {
    shared: &'g GraphShared,
    _hold: ReadGuard<'g>,
    source: EdgeSource,
    filter: Option<View>,
    read_only: bool,
    current: Option<Edge>,
    phase: Option<Phase>,
}

impl<'g> EdgeIter<'g> {
    fn new(
        shared: &'g GraphShared,
        hold: ReadGuard<'g>,
        source: EdgeSource,
        filter: Option<View>,
        read_only: bool,
    ) -> Self {
        Self { shared, _hold: hold, source, filter, read_only, current: None, phase: None }
    }

    /// Phase that produced the last edge. Arena walks report `Out`.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Remove the edge last returned by `next()`.
    ///
    /// The calling thread must hold the write lock. View iterators are
    /// read-only.
    pub fn remove(&mut self) -> Result<bool> {
        if self.read_only {
            return Err(Error::Usage("this iterator is read-only".into()));
        }
        self.shared.lock.check_hold_write_lock()?;
        let edge = self
            .current
            .take()
            .ok_or_else(|| Error::Usage("remove() needs a preceding next()".into()))?;
        self.shared.store.write().remove_edge(&edge)
    }
}

impl Iterator for EdgeIter<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        let store = self.shared.store.read_recursive();
        loop {
            let (sid, phase) = match &mut self.source {
                EdgeSource::Arena { cursor, undirected } => (cursor.next_edge(store.edges(), *undirected)?, Phase::Out),
                EdgeSource::Adjacency(cursor) => cursor.advance(store.nodes(), store.edges())?,
            };
            let Some(slot) = store.edges().slot(sid) else { continue };
            if let Some(view) = &self.filter {
                if !store.view(view).ok()?.contains_edge(sid, slot.source, slot.target) {
                    continue;
                }
            }
            self.phase = Some(phase);
            self.current = Some(slot.edge.clone());
            return Some(slot.edge.clone());
        }
    }
}
