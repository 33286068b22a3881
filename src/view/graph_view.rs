//! Per-view membership record.

use roaring::RoaringBitmap;

use super::View;
use super::hierarchy::NodeGroupTree;
use super::observer::GraphObserver;
use crate::model::{Interval, PropertyMap};
use crate::storage::{EdgeStore, NodeStore};
use crate::StoreId;

/// Structural version counters.
///
/// Counters wrap; observers compare them for equality only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub node: i32,
    pub edge: i32,
}

impl Version {
    pub fn bump_nodes(&mut self) {
        self.node = self.node.wrapping_add(1);
    }

    pub fn bump_edges(&mut self) {
        self.edge = self.edge.wrapping_add(1);
    }
}

/// Flat views filter by bitset only; hierarchical views also hide the
/// descendants of collapsed node groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    Flat,
    Hierarchical(NodeGroupTree),
}

/// Membership queries shared by both view kinds.
pub trait Membership {
    fn contains_node(&self, node: StoreId) -> bool;
    fn contains_edge(&self, edge: StoreId, source: StoreId, target: StoreId) -> bool;
}

/// Membership, hierarchy, interval and observers of one view.
///
/// Invariant: every edge bit set implies both endpoint bits set.
#[derive(Debug, Clone)]
pub struct GraphView {
    pub(crate) handle: View,
    pub(crate) nodes: RoaringBitmap,
    pub(crate) edges: RoaringBitmap,
    pub(crate) kind: ViewKind,
    pub(crate) interval: Interval,
    pub(crate) attributes: PropertyMap,
    pub(crate) version: Version,
    pub(crate) observers: Vec<GraphObserver>,
}

fn bit(sid: StoreId) -> u32 {
    sid as u32
}

impl GraphView {
    pub(crate) fn new(handle: View, kind: ViewKind) -> Self {
        Self {
            handle,
            nodes: RoaringBitmap::new(),
            edges: RoaringBitmap::new(),
            kind,
            interval: Interval::INFINITY,
            attributes: PropertyMap::new(),
            version: Version::default(),
            observers: Vec::new(),
        }
    }

    pub fn handle(&self) -> &View {
        &self.handle
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn tree(&self) -> Option<&NodeGroupTree> {
        match &self.kind {
            ViewKind::Flat => None,
            ViewKind::Hierarchical(tree) => Some(tree),
        }
    }

    pub(crate) fn tree_mut(&mut self) -> Option<&mut NodeGroupTree> {
        match &mut self.kind {
            ViewKind::Flat => None,
            ViewKind::Hierarchical(tree) => Some(tree),
        }
    }

    /// Raw node membership, ignoring collapsed groups.
    pub fn has_node_bit(&self, node: StoreId) -> bool {
        self.nodes.contains(bit(node))
    }

    pub fn has_edge_bit(&self, edge: StoreId) -> bool {
        self.edges.contains(bit(edge))
    }

    /// Copy membership from `base` (copy at birth, no further sharing).
    pub(crate) fn copy_membership(&mut self, base: &GraphView) {
        self.nodes = base.nodes.clone();
        self.edges = base.edges.clone();
    }

    // ========================================================================
    // Membership edits
    // ========================================================================

    pub(crate) fn add_node(&mut self, node: StoreId) -> bool {
        let added = self.nodes.insert(bit(node));
        if added {
            self.version.bump_nodes();
        }
        added
    }

    /// No-op unless both endpoints are already members.
    pub(crate) fn add_edge(&mut self, edge: StoreId, source: StoreId, target: StoreId) -> bool {
        if !self.nodes.contains(bit(source)) || !self.nodes.contains(bit(target)) {
            return false;
        }
        let added = self.edges.insert(bit(edge));
        if added {
            self.version.bump_edges();
        }
        added
    }

    /// Clear the node bit and the bits of every `incident` edge.
    pub(crate) fn remove_node(&mut self, node: StoreId, incident: &[StoreId]) -> bool {
        if !self.nodes.remove(bit(node)) {
            return false;
        }
        self.version.bump_nodes();
        let mut edges_changed = false;
        for &e in incident {
            edges_changed |= self.edges.remove(bit(e));
        }
        if edges_changed {
            self.version.bump_edges();
        }
        true
    }

    pub(crate) fn remove_edge(&mut self, edge: StoreId) -> bool {
        let removed = self.edges.remove(bit(edge));
        if removed {
            self.version.bump_edges();
        }
        removed
    }

    /// Make every stored node and edge a member.
    pub(crate) fn fill(&mut self, nodes: &NodeStore, edges: &EdgeStore) {
        let (node_count, edge_count) = (self.nodes.len(), self.edges.len());
        self.nodes.extend(nodes.slots().map(|(sid, _)| bit(sid)));
        self.edges.extend(edges.slots().map(|(sid, _)| bit(sid)));
        self.bump_if(node_count != self.nodes.len(), edge_count != self.edges.len());
    }

    pub(crate) fn clear(&mut self) {
        let (had_nodes, had_edges) = (!self.nodes.is_empty(), !self.edges.is_empty());
        self.nodes.clear();
        self.edges.clear();
        self.bump_if(had_nodes, had_edges);
    }

    pub(crate) fn clear_edges(&mut self) {
        let had_edges = !self.edges.is_empty();
        self.edges.clear();
        self.bump_if(false, had_edges);
    }

    // ========================================================================
    // Algebra
    // ========================================================================

    pub(crate) fn union(&mut self, nodes: &RoaringBitmap, edges: &RoaringBitmap) {
        let (node_count, edge_count) = (self.nodes.len(), self.edges.len());
        self.nodes |= nodes;
        self.edges |= edges;
        self.bump_if(node_count != self.nodes.len(), edge_count != self.edges.len());
    }

    pub(crate) fn intersection(&mut self, nodes: &RoaringBitmap, edges: &RoaringBitmap) {
        let (node_count, edge_count) = (self.nodes.len(), self.edges.len());
        self.nodes &= nodes;
        self.edges &= edges;
        self.bump_if(node_count != self.nodes.len(), edge_count != self.edges.len());
    }

    /// Complement against everything stored, then drop edges that lost an endpoint.
    pub(crate) fn not(&mut self, nodes: &NodeStore, edges: &EdgeStore) {
        let all_nodes: RoaringBitmap = nodes.slots().map(|(sid, _)| bit(sid)).collect();
        let complement_nodes = &all_nodes - &self.nodes;

        let mut complement_edges = RoaringBitmap::new();
        for (sid, slot) in edges.slots() {
            if !self.edges.contains(bit(sid))
                && complement_nodes.contains(bit(slot.source))
                && complement_nodes.contains(bit(slot.target))
            {
                complement_edges.insert(bit(sid));
            }
        }

        let nodes_changed = complement_nodes != self.nodes;
        let edges_changed = complement_edges != self.edges;
        self.nodes = complement_nodes;
        self.edges = complement_edges;
        self.bump_if(nodes_changed, edges_changed);
    }

    /// Collapse and expand change what is visible without touching the bitsets.
    pub(crate) fn bump_visibility(&mut self) {
        self.bump_if(true, true);
    }

    fn bump_if(&mut self, nodes: bool, edges: bool) {
        if nodes {
            self.version.bump_nodes();
        }
        if edges {
            self.version.bump_edges();
        }
    }

    // ========================================================================
    // Store notifications
    // ========================================================================

    pub(crate) fn on_node_removed(&mut self, node: StoreId) {
        if self.nodes.remove(bit(node)) {
            self.version.bump_nodes();
        }
        if let Some(tree) = self.tree_mut() {
            tree.remove_node(node);
        }
    }

    pub(crate) fn on_edge_removed(&mut self, edge: StoreId) {
        self.remove_edge(edge);
    }

    // ========================================================================
    // Counts
    // ========================================================================

    pub fn node_count(&self) -> usize {
        match &self.kind {
            ViewKind::Flat => self.nodes.len() as usize,
            ViewKind::Hierarchical(tree) => {
                self.nodes.iter().filter(|&n| !tree.is_hidden(n as StoreId)).count()
            }
        }
    }

    pub fn edge_count(&self, edges: &EdgeStore) -> usize {
        match &self.kind {
            ViewKind::Flat => self.edges.len() as usize,
            ViewKind::Hierarchical(_) => self
                .edges
                .iter()
                .filter(|&e| {
                    edges
                        .slot(e as StoreId)
                        .is_some_and(|slot| self.contains_edge(e as StoreId, slot.source, slot.target))
                })
                .count(),
        }
    }
}

impl Membership for GraphView {
    fn contains_node(&self, node: StoreId) -> bool {
        if node < 0 || !self.nodes.contains(bit(node)) {
            return false;
        }
        match &self.kind {
            ViewKind::Flat => true,
            ViewKind::Hierarchical(tree) => !tree.is_hidden(node),
        }
    }

    fn contains_edge(&self, edge: StoreId, source: StoreId, target: StoreId) -> bool {
        if edge < 0 || !self.edges.contains(bit(edge)) {
            return false;
        }
        match &self.kind {
            ViewKind::Flat => true,
            ViewKind::Hierarchical(tree) => !tree.is_hidden(source) && !tree.is_hidden(target),
        }
    }
}
