//! # Graph Store
//!
//! The unlocked composite behind [`crate::Graph`]: node and edge arenas, the
//! edge type registry, views, version counters, observers and index hooks.
//! Single-threaded callers may use a [`GraphStore`] directly; everything else
//! goes through the locked facade.
//!
//! | Item | Module | Description |
//! |------|--------|-------------|
//! | `SlotAllocator` | `slots` | dense ids with a LIFO garbage queue |
//! | `EdgeTypeRegistry` | `edge_types` | label ↔ id, at most 65,534 live |
//! | `NodeStore` | `nodes` | node arena, external-id dictionary |
//! | `EdgeStore` | `edges` | edge arena, intrusive adjacency chains |
//! | `Nodes` / `Edges` / `Adjacency` | `iter` | borrowing iterators |

pub mod edge_types;
pub mod edges;
pub mod iter;
pub mod nodes;
pub mod slots;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashSet;
use tracing::{debug, trace};

use crate::config::{GraphConfig, GraphKind};
use crate::index::{DefaultValueProvider, GraphListener, Listeners};
use crate::model::{Direction, Edge, ElementId, Interval, Node, Value};
use crate::view::observer::Snapshot;
use crate::view::{GraphObserver, GraphView, Membership, NodeGroupTree, Version, View, ViewStore};
use crate::{Error, Result, StoreId};

pub use edge_types::{EdgeTypeRegistry, MAX_EDGE_TYPES};
pub use edges::EdgeStore;
pub use iter::{Adjacency, Edges, Nodes};
pub use nodes::NodeStore;
pub use slots::{Growth, SlotAllocator};

pub(crate) use iter::{AdjacencyCursor, ArenaCursor};
use nodes::NodeSlot;

/// Identifies the store an entity or view is bound to. Zero means unbound.
pub(crate) type StoreToken = u64;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_store_token() -> StoreToken {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// GraphStore
// ============================================================================

#[derive(Debug)]
pub struct GraphStore {
    token: StoreToken,
    config: GraphConfig,
    nodes: NodeStore,
    edges: EdgeStore,
    types: EdgeTypeRegistry,
    views: ViewStore,
    /// Versions of the main (unfiltered) graph.
    pub(crate) version: Version,
    observers: Vec<GraphObserver>,
    listeners: Listeners,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::open(GraphConfig::default())
    }
}

impl GraphStore {
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::open(config))
    }

    fn open(config: GraphConfig) -> Self {
        let token = next_store_token();
        debug!(token, kind = ?config.kind, "store.open");
        Self {
            token,
            nodes: NodeStore::new(token, config.node_block_size),
            edges: EdgeStore::new(token, config.kind, config.edge_block_size),
            types: EdgeTypeRegistry::new(),
            views: ViewStore::new(token),
            version: Version::default(),
            observers: Vec::new(),
            listeners: Listeners::default(),
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn kind(&self) -> GraphKind {
        self.config.kind
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    pub fn edge_types(&self) -> &EdgeTypeRegistry {
        &self.types
    }

    pub fn views(&self) -> &ViewStore {
        &self.views
    }

    /// Version pair of the main graph.
    pub fn version(&self) -> Version {
        self.version
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Store `node`. `Ok(false)` when this instance is already stored.
    pub fn add_node(&mut self, node: &Node) -> Result<bool> {
        if !self.nodes.add(node)? {
            return Ok(false);
        }
        self.version.bump_nodes();
        self.listeners.each(|l| l.on_node_added(node));
        Ok(true)
    }

    /// Remove `node` and every edge touching it.
    ///
    /// `Ok(false)` for a node that is not stored; a node of another store is
    /// an ownership fault.
    pub fn remove_node(&mut self, node: &Node) -> Result<bool> {
        if !self.nodes.check(node)? {
            return Ok(false);
        }
        let sid = node.store_id();
        let incident: Vec<Edge> = self
            .nodes
            .slot(sid)
            .map(|slot| self.edges.incident(slot))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|e| self.edges.slot(e).map(|slot| slot.edge.clone()))
            .collect();
        for edge in &incident {
            self.remove_edge(edge)?;
        }
        for view in self.views.iter_mut() {
            view.on_node_removed(sid);
        }
        self.nodes.remove(node)?;
        self.version.bump_nodes();
        self.listeners.each(|l| l.on_node_removed(node));
        trace!(sid, incident = incident.len(), "store.node.remove");
        Ok(true)
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.nodes.contains(node)
    }

    /// Node at `sid`. Out-of-range ids are a fault; free slots yield `None`.
    pub fn node(&self, sid: StoreId) -> Result<Option<Node>> {
        self.nodes.get(sid)
    }

    pub fn node_by_id(&self, id: &ElementId) -> Option<Node> {
        self.nodes.get_by_id(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_iter(&self) -> Nodes<'_> {
        Nodes::new(&self.nodes)
    }

    fn node_at(&self, sid: StoreId) -> Option<Node> {
        self.nodes.slot(sid).map(|slot| slot.node.clone())
    }

    fn node_slot(&self, node: &Node) -> Result<&NodeSlot> {
        let sid = self.nodes.resolve(node)?;
        self.nodes
            .slot(sid)
            .ok_or_else(|| Error::NotFound(format!("node {} has no slot", node.id())))
    }

    /// Store id of `node` if stored here, `None` if unbound.
    fn stored(&self, node: &Node) -> Result<Option<StoreId>> {
        Ok(self.nodes.check(node)?.then(|| node.store_id()))
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Store `edge`; both endpoints must already be stored here.
    pub fn add_edge(&mut self, edge: &Edge) -> Result<bool> {
        if !self.edges.add(edge, &mut self.nodes, &mut self.types)? {
            return Ok(false);
        }
        self.version.bump_edges();
        self.listeners.each(|l| l.on_edge_added(edge));
        Ok(true)
    }

    pub fn remove_edge(&mut self, edge: &Edge) -> Result<bool> {
        if !self.edges.check(edge)? {
            return Ok(false);
        }
        let sid = edge.store_id();
        self.edges.remove(edge, &mut self.nodes)?;
        for view in self.views.iter_mut() {
            view.on_edge_removed(sid);
        }
        self.version.bump_edges();
        self.listeners.each(|l| l.on_edge_removed(edge));
        Ok(true)
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    pub fn edge(&self, sid: StoreId) -> Result<Option<Edge>> {
        self.edges.get(sid)
    }

    pub fn edge_by_id(&self, id: &ElementId) -> Option<Edge> {
        self.edges.get_by_id(id)
    }

    /// The edge of type `edge_type` from `source` to `target`. Undirected
    /// records match in either orientation.
    pub fn get_edge(&self, source: &Node, target: &Node, edge_type: &str) -> Result<Option<Edge>> {
        let (Some(s), Some(t)) = (self.stored(source)?, self.stored(target)?) else {
            return Ok(None);
        };
        let Some(ty) = self.types.id_of(edge_type) else {
            return Ok(None);
        };
        Ok(self.edge_at(self.edges.find_either(s, t, ty)))
    }

    /// First edge of any type between `source` and `target`.
    pub fn get_edge_any_type(&self, source: &Node, target: &Node) -> Result<Option<Edge>> {
        let (Some(s), Some(t)) = (self.stored(source)?, self.stored(target)?) else {
            return Ok(None);
        };
        Ok(self
            .types
            .iter()
            .find_map(|(ty, _)| self.edges.find_either(s, t, ty))
            .and_then(|sid| self.edge_at(Some(sid))))
    }

    pub fn has_edge(&self, source: &Node, target: &Node, edge_type: &str) -> Result<bool> {
        Ok(self.get_edge(source, target, edge_type)?.is_some())
    }

    fn edge_at(&self, sid: Option<StoreId>) -> Option<Edge> {
        sid.and_then(|sid| self.edges.slot(sid)).map(|slot| slot.edge.clone())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count_of_type(&self, edge_type: &str) -> usize {
        self.types.id_of(edge_type).map_or(0, |ty| self.edges.type_count(ty))
    }

    /// Edges counted once per mutual pair.
    pub fn undirected_edge_count(&self) -> usize {
        self.edges.undirected_len()
    }

    pub fn mutual_edge_count(&self) -> usize {
        self.edges.mutual_count()
    }

    pub fn self_loop_count(&self) -> usize {
        self.edges.self_loop_count()
    }

    /// All edges in arena order; `undirected` folds mutual pairs.
    pub fn edge_iter(&self, undirected: bool) -> Edges<'_> {
        Edges::new(&self.edges, undirected)
    }

    // ========================================================================
    // Adjacency
    // ========================================================================

    pub(crate) fn adjacency_cursor(
        &self,
        sid: StoreId,
        direction: Direction,
        edge_type: Option<&str>,
        undirected: bool,
    ) -> AdjacencyCursor {
        match edge_type.map(|label| self.types.id_of(label)) {
            None => AdjacencyCursor::new(sid, direction, None, undirected),
            Some(Some(ty)) => AdjacencyCursor::new(sid, direction, Some(ty), undirected),
            Some(None) => AdjacencyCursor::new(sid, direction, None, undirected).exhausted(),
        }
    }

    /// Edges around `node`, optionally restricted to one type.
    pub fn adjacency(
        &self,
        node: &Node,
        direction: Direction,
        edge_type: Option<&str>,
        undirected: bool,
    ) -> Result<Adjacency<'_>> {
        let sid = self.nodes.resolve(node)?;
        let cursor = self.adjacency_cursor(sid, direction, edge_type, undirected);
        Ok(Adjacency::new(&self.nodes, &self.edges, cursor))
    }

    /// Distinct adjacent nodes in chain order. A self-loop yields `node`.
    pub fn neighbors(&self, node: &Node, direction: Direction) -> Result<Vec<Node>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (_, edge) in self.adjacency(node, direction, None, false)? {
            let Some(other) = edge.other_node(node) else { continue };
            if seen.insert(other.clone()) {
                out.push(other.clone());
            }
        }
        Ok(out)
    }

    pub fn out_degree(&self, node: &Node) -> Result<usize> {
        Ok(self.node_slot(node)?.out_degree as usize)
    }

    pub fn in_degree(&self, node: &Node) -> Result<usize> {
        Ok(self.node_slot(node)?.in_degree as usize)
    }

    /// In + out; a self-loop counts twice.
    pub fn degree(&self, node: &Node) -> Result<usize> {
        let slot = self.node_slot(node)?;
        Ok((slot.out_degree + slot.in_degree) as usize)
    }

    /// Number of mutual pairs `node` takes part in.
    pub fn mutual_degree(&self, node: &Node) -> Result<usize> {
        Ok(self.node_slot(node)?.mutual_degree as usize)
    }

    /// Degree with each mutual pair counted once.
    pub fn undirected_degree(&self, node: &Node) -> Result<usize> {
        let slot = self.node_slot(node)?;
        Ok((slot.out_degree + slot.in_degree - slot.mutual_degree) as usize)
    }

    pub fn degree_of_type(&self, node: &Node, direction: Direction, edge_type: &str) -> Result<usize> {
        Ok(self.adjacency(node, direction, Some(edge_type), false)?.count())
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================
    //
    // Each applies the single-entity operation in order and stops at the
    // first fault. Elements applied before the fault stay applied; there is
    // no rollback.

    pub fn add_nodes<'a>(&mut self, nodes: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        let mut changed = 0;
        for node in nodes {
            changed += usize::from(self.add_node(node)?);
        }
        Ok(changed)
    }

    pub fn remove_nodes<'a>(&mut self, nodes: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        let mut changed = 0;
        for node in nodes {
            changed += usize::from(self.remove_node(node)?);
        }
        Ok(changed)
    }

    pub fn add_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
        let mut changed = 0;
        for edge in edges {
            changed += usize::from(self.add_edge(edge)?);
        }
        Ok(changed)
    }

    pub fn remove_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
        let mut changed = 0;
        for edge in edges {
            changed += usize::from(self.remove_edge(edge)?);
        }
        Ok(changed)
    }

    /// Remove every node not in `keep`. Returns the number removed.
    pub fn retain_nodes<'a>(&mut self, keep: impl IntoIterator<Item = &'a Node>) -> Result<usize> {
        let keep: HashSet<&Node> = keep.into_iter().collect();
        let doomed: Vec<Node> = self.nodes.iter().filter(|n| !keep.contains(n)).cloned().collect();
        self.remove_nodes(&doomed)
    }

    /// Remove every edge not in `keep`. Returns the number removed.
    pub fn retain_edges<'a>(&mut self, keep: impl IntoIterator<Item = &'a Edge>) -> Result<usize> {
        let keep: HashSet<&Edge> = keep.into_iter().collect();
        let doomed: Vec<Edge> = self.edges.iter().filter(|e| !keep.contains(e)).cloned().collect();
        self.remove_edges(&doomed)
    }

    /// Drop every node and edge; arenas shrink back to one empty block.
    /// Edge types and views survive, views emptied.
    pub fn clear(&mut self) {
        let (had_nodes, had_edges) = (!self.nodes.is_empty(), !self.edges.is_empty());
        self.edges.clear();
        self.nodes.clear();
        for view in self.views.iter_mut() {
            view.clear();
            if let Some(tree) = view.tree_mut() {
                tree.clear();
            }
        }
        if had_nodes {
            self.version.bump_nodes();
        }
        if had_edges {
            self.version.bump_edges();
        }
        self.listeners.each(|l| l.on_clear());
        debug!(token = self.token, "store.clear");
    }

    /// Drop every edge, keeping the nodes.
    pub fn clear_edges(&mut self) {
        let had_edges = !self.edges.is_empty();
        self.edges.clear();
        self.nodes.reset_adjacency();
        for view in self.views.iter_mut() {
            view.clear_edges();
        }
        if had_edges {
            self.version.bump_edges();
        }
        self.listeners.each(|l| l.on_clear_edges());
        debug!(token = self.token, "store.clear_edges");
    }

    // ========================================================================
    // Edge types
    // ========================================================================

    pub fn add_edge_type(&mut self, label: &str) -> Result<StoreId> {
        self.types.add_type(label)
    }

    /// Unregister `label`. Unknown labels yield `None`; a type still carried
    /// by an edge is a usage fault.
    pub fn remove_edge_type(&mut self, label: &str) -> Result<Option<StoreId>> {
        if let Some(ty) = self.types.id_of(label) {
            let in_use = self.edges.type_count(ty);
            if in_use > 0 {
                return Err(Error::Usage(format!("edge type {label} is still used by {in_use} edges")));
            }
        }
        Ok(self.types.remove_type(label))
    }

    /// Unregister the type with store id `id`, returning its label. Unknown
    /// ids yield `None`; a type still carried by an edge is a usage fault.
    pub fn remove_edge_type_id(&mut self, id: StoreId) -> Result<Option<String>> {
        if self.types.label_of(id).is_ok() {
            let in_use = self.edges.type_count(id);
            if in_use > 0 {
                return Err(Error::Usage(format!("edge type {id} is still used by {in_use} edges")));
            }
        }
        Ok(self.types.remove_type_id(id))
    }

    pub fn edge_type_id(&self, label: &str) -> Option<StoreId> {
        self.types.id_of(label)
    }

    pub fn edge_type_label(&self, id: StoreId) -> Result<&str> {
        self.types.label_of(id)
    }

    pub fn edge_type_count(&self) -> usize {
        self.types.len()
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn create_view(&mut self) -> Result<View> {
        self.views.create(false, None)
    }

    /// New view of the same kind as `base`, starting with a copy of its
    /// membership. Node groups are not copied.
    pub fn create_view_from(&mut self, base: &View) -> Result<View> {
        self.views.create(base.is_hierarchical(), Some(base))
    }

    pub fn create_hierarchical_view(&mut self) -> Result<View> {
        self.views.create(true, None)
    }

    /// Destroy `view` and every observer attached to it.
    pub fn destroy_view(&mut self, view: &View) -> Result<()> {
        let record = self.views.destroy(view)?;
        for observer in &record.observers {
            observer.mark_destroyed();
        }
        self.listeners.each(|l| l.on_view_destroyed(view));
        Ok(())
    }

    pub fn view(&self, view: &View) -> Result<&GraphView> {
        self.views.get(view)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn visible_view(&self) -> Option<View> {
        self.views.visible().cloned()
    }

    /// Select the visible view; `None` selects the main graph.
    pub fn set_visible_view(&mut self, view: Option<&View>) -> Result<()> {
        self.views.set_visible(view)
    }

    pub fn fill_view(&mut self, view: &View) -> Result<()> {
        self.views.get_mut(view)?.fill(&self.nodes, &self.edges);
        Ok(())
    }

    pub fn clear_view(&mut self, view: &View) -> Result<()> {
        self.views.get_mut(view)?.clear();
        Ok(())
    }

    pub fn view_add_node(&mut self, view: &View, node: &Node) -> Result<bool> {
        let sid = self.nodes.resolve(node)?;
        Ok(self.views.get_mut(view)?.add_node(sid))
    }

    /// `Ok(false)` unless both endpoints are already members.
    pub fn view_add_edge(&mut self, view: &View, edge: &Edge) -> Result<bool> {
        let sid = self.edges.resolve(edge)?;
        let (source, target) = self
            .edges
            .slot(sid)
            .map(|slot| (slot.source, slot.target))
            .ok_or_else(|| Error::NotFound(format!("edge {} has no slot", edge.id())))?;
        Ok(self.views.get_mut(view)?.add_edge(sid, source, target))
    }

    /// Clear the node's bit and the bits of every incident edge.
    pub fn view_remove_node(&mut self, view: &View, node: &Node) -> Result<bool> {
        let sid = self.nodes.resolve(node)?;
        let incident = self.nodes.slot(sid).map(|slot| self.edges.incident(slot)).unwrap_or_default();
        Ok(self.views.get_mut(view)?.remove_node(sid, &incident))
    }

    pub fn view_remove_edge(&mut self, view: &View, edge: &Edge) -> Result<bool> {
        let sid = self.edges.resolve(edge)?;
        Ok(self.views.get_mut(view)?.remove_edge(sid))
    }

    /// Visible membership of `node`. Unstored nodes are not members.
    pub fn view_contains_node(&self, view: &View, node: &Node) -> Result<bool> {
        let gv = self.views.get(view)?;
        Ok(self.nodes.check(node)? && gv.contains_node(node.store_id()))
    }

    pub fn view_contains_edge(&self, view: &View, edge: &Edge) -> Result<bool> {
        let gv = self.views.get(view)?;
        if !self.edges.check(edge)? {
            return Ok(false);
        }
        let sid = edge.store_id();
        Ok(self
            .edges
            .slot(sid)
            .is_some_and(|slot| gv.contains_edge(sid, slot.source, slot.target)))
    }

    pub fn view_node_count(&self, view: &View) -> Result<usize> {
        Ok(self.views.get(view)?.node_count())
    }

    pub fn view_edge_count(&self, view: &View) -> Result<usize> {
        Ok(self.views.get(view)?.edge_count(&self.edges))
    }

    pub fn view_nodes(&self, view: &View) -> Result<impl Iterator<Item = &Node> + '_> {
        let gv = self.views.get(view)?;
        Ok(self
            .nodes
            .slots()
            .filter(move |(sid, _)| gv.contains_node(*sid))
            .map(|(_, slot)| &slot.node))
    }

    pub fn view_edges(&self, view: &View) -> Result<impl Iterator<Item = &Edge> + '_> {
        let gv = self.views.get(view)?;
        Ok(self
            .edges
            .slots()
            .filter(move |(sid, slot)| gv.contains_edge(*sid, slot.source, slot.target))
            .map(|(_, slot)| &slot.edge))
    }

    /// Degree of `node` counting only edges visible in `view`.
    pub fn view_degree(&self, view: &View, node: &Node, direction: Direction) -> Result<usize> {
        let gv = self.views.get(view)?;
        let count = self
            .adjacency(node, direction, None, false)?
            .filter(|(_, edge)| {
                self.edges
                    .slot(edge.store_id())
                    .is_some_and(|slot| gv.contains_edge(edge.store_id(), slot.source, slot.target))
            })
            .count();
        Ok(count)
    }

    /// Pointwise OR with `other`. Both views must belong to this store.
    pub fn view_union(&mut self, view: &View, other: &View) -> Result<()> {
        let o = self.views.get(other)?;
        let (nodes, edges) = (o.nodes.clone(), o.edges.clone());
        self.views.get_mut(view)?.union(&nodes, &edges);
        Ok(())
    }

    /// Pointwise AND with `other`. Both views must belong to this store.
    pub fn view_intersection(&mut self, view: &View, other: &View) -> Result<()> {
        let o = self.views.get(other)?;
        let (nodes, edges) = (o.nodes.clone(), o.edges.clone());
        self.views.get_mut(view)?.intersection(&nodes, &edges);
        Ok(())
    }

    /// Complement against everything stored.
    pub fn view_not(&mut self, view: &View) -> Result<()> {
        self.views.get_mut(view)?.not(&self.nodes, &self.edges);
        Ok(())
    }

    /// Attach a time restriction; `None` resets to (−∞, +∞).
    pub fn set_view_interval(&mut self, view: &View, interval: Option<Interval>) -> Result<()> {
        self.views.get_mut(view)?.interval = interval.unwrap_or(Interval::INFINITY);
        Ok(())
    }

    pub fn view_interval(&self, view: &View) -> Result<Interval> {
        Ok(self.views.get(view)?.interval())
    }

    pub fn set_view_attribute(
        &mut self,
        view: &View,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        Ok(self.views.get_mut(view)?.attributes.insert(key.into(), value.into()))
    }

    pub fn view_attribute(&self, view: &View, key: &str) -> Result<Option<Value>> {
        Ok(self.views.get(view)?.attributes.get(key).cloned())
    }

    pub fn remove_view_attribute(&mut self, view: &View, key: &str) -> Result<Option<Value>> {
        Ok(self.views.get_mut(view)?.attributes.remove(key))
    }

    // ========================================================================
    // Node groups
    // ========================================================================

    fn tree(&self, view: &View) -> Result<&NodeGroupTree> {
        self.views.get(view)?.tree().ok_or_else(|| not_hierarchical(view))
    }

    /// Apply `f` to the view's group tree; bump the view's versions when it
    /// reports a visible change.
    fn edit_tree<T>(&mut self, view: &View, f: impl FnOnce(&mut NodeGroupTree) -> Result<(T, bool)>) -> Result<T> {
        let gv = self.views.get_mut(view)?;
        let tree = gv.tree_mut().ok_or_else(|| not_hierarchical(view))?;
        let (out, changed) = f(tree)?;
        if changed {
            gv.bump_visibility();
        }
        Ok(out)
    }

    /// Make `members` children of `representative` in a hierarchical view.
    pub fn group(&mut self, view: &View, representative: &Node, members: &[Node]) -> Result<()> {
        let rep = self.nodes.resolve(representative)?;
        let ids = members
            .iter()
            .map(|m| self.nodes.resolve(m))
            .collect::<Result<Vec<_>>>()?;
        self.edit_tree(view, |tree| tree.group(rep, &ids).map(|()| ((), true)))
    }

    pub fn ungroup(&mut self, view: &View, representative: &Node) -> Result<bool> {
        let rep = self.nodes.resolve(representative)?;
        self.edit_tree(view, |tree| {
            let done = tree.ungroup(rep);
            Ok((done, done))
        })
    }

    pub fn collapse(&mut self, view: &View, representative: &Node) -> Result<bool> {
        let rep = self.nodes.resolve(representative)?;
        self.edit_tree(view, |tree| {
            let done = tree.collapse(rep);
            Ok((done, done))
        })
    }

    pub fn expand(&mut self, view: &View, representative: &Node) -> Result<bool> {
        let rep = self.nodes.resolve(representative)?;
        self.edit_tree(view, |tree| {
            let done = tree.expand(rep);
            Ok((done, done))
        })
    }

    pub fn is_collapsed(&self, view: &View, node: &Node) -> Result<bool> {
        let sid = self.nodes.resolve(node)?;
        Ok(self.tree(view)?.is_collapsed(sid))
    }

    pub fn is_hidden(&self, view: &View, node: &Node) -> Result<bool> {
        let sid = self.nodes.resolve(node)?;
        Ok(self.tree(view)?.is_hidden(sid))
    }

    pub fn group_parent(&self, view: &View, node: &Node) -> Result<Option<Node>> {
        let sid = self.nodes.resolve(node)?;
        Ok(self.tree(view)?.parent(sid).and_then(|p| self.node_at(p)))
    }

    pub fn group_children(&self, view: &View, node: &Node) -> Result<Vec<Node>> {
        let sid = self.nodes.resolve(node)?;
        Ok(self.tree(view)?.children(sid).iter().filter_map(|&c| self.node_at(c)).collect())
    }

    /// The node currently standing in for `node`: its outermost collapsed
    /// ancestor, or `node` itself.
    pub fn map_to_visible(&self, view: &View, node: &Node) -> Result<Node> {
        let sid = self.nodes.resolve(node)?;
        let visible = self.tree(view)?.map_to_visible(sid);
        Ok(self.node_at(visible).unwrap_or_else(|| node.clone()))
    }

    /// The raw nodes `node` stands in for.
    pub fn map_with_hidden(&self, view: &View, node: &Node) -> Result<Vec<Node>> {
        let sid = self.nodes.resolve(node)?;
        Ok(self
            .tree(view)?
            .map_with_hidden(sid)
            .into_iter()
            .filter_map(|n| self.node_at(n))
            .collect())
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Version pair of `view`, or of the main graph for `None`.
    pub fn version_of(&self, view: Option<&View>) -> Result<Version> {
        match view {
            None => Ok(self.version),
            Some(v) => Ok(self.views.get(v)?.version()),
        }
    }

    pub(crate) fn snapshot(&self, view: Option<&View>) -> Result<Snapshot> {
        let mut snap = Snapshot::default();
        match view {
            None => {
                snap.nodes.extend(self.nodes.iter().cloned());
                snap.edges.extend(self.edges.iter().cloned());
            }
            Some(v) => {
                let gv = self.views.get(v)?;
                for (sid, slot) in self.nodes.slots() {
                    if gv.contains_node(sid) {
                        snap.nodes.insert(slot.node.clone());
                    }
                }
                for (sid, slot) in self.edges.slots() {
                    if gv.contains_edge(sid, slot.source, slot.target) {
                        snap.edges.insert(slot.edge.clone());
                    }
                }
            }
        }
        Ok(snap)
    }

    pub(crate) fn attach_observer(&mut self, observer: GraphObserver) -> Result<()> {
        match observer.view().cloned() {
            None => self.observers.push(observer),
            Some(v) => self.views.get_mut(&v)?.observers.push(observer),
        }
        Ok(())
    }

    pub(crate) fn detach_observer(&mut self, observer: &GraphObserver) -> bool {
        let list = match observer.view() {
            None => &mut self.observers,
            Some(v) => match self.views.get_mut(v) {
                Ok(gv) => &mut gv.observers,
                Err(_) => return false,
            },
        };
        let before = list.len();
        list.retain(|o| !o.same(observer));
        before != list.len()
    }

    /// Live observers of `view`, or of the main graph for `None`.
    pub fn observer_count(&self, view: Option<&View>) -> Result<usize> {
        match view {
            None => Ok(self.observers.len()),
            Some(v) => Ok(self.views.get(v)?.observers.len()),
        }
    }

    // ========================================================================
    // Index hooks
    // ========================================================================

    pub fn register_listener(&mut self, listener: Arc<dyn GraphListener>) {
        self.listeners.register(listener);
    }

    pub fn unregister_listener(&mut self, listener: &Arc<dyn GraphListener>) -> bool {
        self.listeners.unregister(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn set_default_value_provider(&mut self, provider: Option<Arc<dyn DefaultValueProvider>>) {
        self.listeners.set_defaults(provider);
    }

    /// Forwarded to the registered [`DefaultValueProvider`], if any.
    pub fn default_value(&self, key: &str) -> Option<Value> {
        self.listeners.default_value(key)
    }
}

fn not_hierarchical(view: &View) -> Error {
    Error::Usage(format!("view {} is not hierarchical", view.store_id()))
}
