//! Edge arena with intrusive adjacency chains.
//!
//! Every edge slot sits on two doubly linked chains: its source's out-chain
//! and its target's in-chain, one chain per (node, edge type). Insertion is
//! at the head, removal unsplices in O(1). A self-loop sits on both chains
//! of the same node.

use hashbrown::HashMap;
use tracing::trace;

use super::{EdgeTypeRegistry, NodeStore, SlotAllocator, StoreToken};
use crate::config::GraphKind;
use crate::model::{Edge, ElementId, Node, Phase};
use crate::{Error, NULL_ID, Result, StoreId};

/// Arena record of a stored edge.
#[derive(Debug, Clone)]
pub(crate) struct EdgeSlot {
    pub edge: Edge,
    pub source: StoreId,
    pub target: StoreId,
    pub edge_type: StoreId,
    pub directed: bool,
    pub mutual: bool,
    pub next_out: StoreId,
    pub prev_out: StoreId,
    pub next_in: StoreId,
    pub prev_in: StoreId,
}

impl EdgeSlot {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Whether an undirected walk emits this slot.
    ///
    /// Of a mutual pair only the record whose source id is greater than its
    /// target id is emitted. In a combined in-out walk a self-loop is emitted
    /// in the out phase only.
    pub fn emit_undirected(&self, phase: Phase, combined: bool) -> bool {
        if self.is_self_loop() {
            return !(combined && phase == Phase::In);
        }
        if self.mutual {
            return self.source > self.target;
        }
        true
    }
}

/// Edge arena, dictionaries and per-type counters.
#[derive(Debug)]
pub struct EdgeStore {
    token: StoreToken,
    kind: GraphKind,
    slots: SlotAllocator<EdgeSlot>,
    dictionary: HashMap<ElementId, StoreId>,
    /// (source, target, type) → edge slot
    pairs: HashMap<(StoreId, StoreId, StoreId), StoreId>,
    type_counts: Vec<usize>,
    mutual_count: usize,
    self_loops: usize,
}

impl EdgeStore {
    pub(crate) fn new(token: StoreToken, kind: GraphKind, block_size: usize) -> Self {
        Self {
            token,
            kind,
            slots: SlotAllocator::with_block_size(block_size),
            dictionary: HashMap::new(),
            pairs: HashMap::new(),
            type_counts: Vec::new(),
            mutual_count: 0,
            self_loops: 0,
        }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Whether `edge` is currently stored here.
    ///
    /// Fails with [`Error::Ownership`] when it is stored in another store.
    pub fn check(&self, edge: &Edge) -> Result<bool> {
        match edge.owner() {
            0 => Ok(false),
            owner if owner == self.token => Ok(self
                .slots
                .get(edge.store_id())
                .is_some_and(|slot| slot.edge == *edge)),
            _ => Err(Error::Ownership(format!("edge {} belongs to another store", edge.id()))),
        }
    }

    pub fn resolve(&self, edge: &Edge) -> Result<StoreId> {
        if self.check(edge)? {
            Ok(edge.store_id())
        } else {
            Err(Error::NotFound(format!("edge {} is not in this store", edge.id())))
        }
    }

    pub fn contains(&self, edge: &Edge) -> bool {
        self.check(edge).unwrap_or(false)
    }

    // ========================================================================
    // Insertion / removal
    // ========================================================================

    pub(crate) fn add(
        &mut self,
        edge: &Edge,
        nodes: &mut NodeStore,
        types: &mut EdgeTypeRegistry,
    ) -> Result<bool> {
        if edge.id().is_absent() {
            return Err(Error::NullInput("edge id is empty".into()));
        }
        if self.check(edge)? {
            return Ok(false);
        }
        let source = endpoint(nodes, edge.source(), "source")?;
        let target = endpoint(nodes, edge.target(), "target")?;
        let directed = edge.is_directed();
        if !self.kind.admits(directed) {
            return Err(Error::Usage(format!(
                "{} edge {} cannot be added to a {:?} graph",
                if directed { "directed" } else { "undirected" },
                edge.id(),
                self.kind
            )));
        }
        if self.dictionary.contains_key(edge.id()) {
            return Err(Error::Duplicate(format!("edge id {} already exists", edge.id())));
        }
        if let Some(ty) = types.id_of(edge.edge_type()) {
            self.check_conflict(source, target, ty, directed)?;
        }

        let ty = types.add_type(edge.edge_type())?;
        let sid = self.slots.alloc(EdgeSlot {
            edge: edge.clone(),
            source,
            target,
            edge_type: ty,
            directed,
            mutual: false,
            next_out: NULL_ID,
            prev_out: NULL_ID,
            next_in: NULL_ID,
            prev_in: NULL_ID,
        })?;
        self.link(sid, source, target, ty, nodes);

        if directed && source != target {
            if let Some(&reverse) = self.pairs.get(&(target, source, ty)) {
                self.set_mutual(sid, reverse, true, nodes);
            }
        }
        if source == target {
            self.self_loops += 1;
        }
        self.pairs.insert((source, target, ty), sid);
        self.dictionary.insert(edge.id().clone(), sid);
        if self.type_counts.len() <= ty as usize {
            self.type_counts.resize(ty as usize + 1, 0);
        }
        self.type_counts[ty as usize] += 1;
        edge.bind(self.token, sid);
        trace!(sid, source, target, edge_type = ty, "edges.add");
        Ok(true)
    }

    fn check_conflict(&self, source: StoreId, target: StoreId, ty: StoreId, directed: bool) -> Result<()> {
        if self.pairs.contains_key(&(source, target, ty)) {
            return Err(Error::Duplicate(format!(
                "an edge {source} -> {target} of type {ty} already exists"
            )));
        }
        if source != target {
            if let Some(reverse) = self.pairs.get(&(target, source, ty)).and_then(|&r| self.slots.get(r)) {
                if !directed || !reverse.directed {
                    return Err(Error::Duplicate(format!(
                        "an undirected edge already connects {source} and {target} with type {ty}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn link(&mut self, sid: StoreId, source: StoreId, target: StoreId, ty: StoreId, nodes: &mut NodeStore) {
        let out_head = nodes.slot(source).map_or(NULL_ID, |n| n.head_out(ty));
        let in_head = nodes.slot(target).map_or(NULL_ID, |n| n.head_in(ty));
        if let Some(slot) = self.slots.get_mut(sid) {
            slot.next_out = out_head;
            slot.next_in = in_head;
        }
        if let Some(head) = self.slots.get_mut(out_head) {
            head.prev_out = sid;
        }
        if let Some(head) = self.slots.get_mut(in_head) {
            head.prev_in = sid;
        }
        if let Some(n) = nodes.slot_mut(source) {
            n.set_head_out(ty, sid);
            n.out_degree += 1;
        }
        if let Some(n) = nodes.slot_mut(target) {
            n.set_head_in(ty, sid);
            n.in_degree += 1;
        }
    }

    fn unlink(&mut self, slot: &EdgeSlot, nodes: &mut NodeStore) {
        let ty = slot.edge_type;
        match self.slots.get_mut(slot.prev_out) {
            Some(prev) => prev.next_out = slot.next_out,
            None => {
                if let Some(n) = nodes.slot_mut(slot.source) {
                    n.set_head_out(ty, slot.next_out);
                }
            }
        }
        if let Some(next) = self.slots.get_mut(slot.next_out) {
            next.prev_out = slot.prev_out;
        }
        match self.slots.get_mut(slot.prev_in) {
            Some(prev) => prev.next_in = slot.next_in,
            None => {
                if let Some(n) = nodes.slot_mut(slot.target) {
                    n.set_head_in(ty, slot.next_in);
                }
            }
        }
        if let Some(next) = self.slots.get_mut(slot.next_in) {
            next.prev_in = slot.prev_in;
        }
        if let Some(n) = nodes.slot_mut(slot.source) {
            n.out_degree -= 1;
        }
        if let Some(n) = nodes.slot_mut(slot.target) {
            n.in_degree -= 1;
        }
    }

    fn set_mutual(&mut self, a: StoreId, b: StoreId, mutual: bool, nodes: &mut NodeStore) {
        let mut endpoints = None;
        for sid in [a, b] {
            if let Some(slot) = self.slots.get_mut(sid) {
                slot.mutual = mutual;
                endpoints = Some((slot.source, slot.target));
            }
        }
        if let Some((s, t)) = endpoints {
            for n in [s, t] {
                if let Some(node) = nodes.slot_mut(n) {
                    if mutual {
                        node.mutual_degree += 1;
                    } else {
                        node.mutual_degree -= 1;
                    }
                }
            }
        }
        if mutual {
            self.mutual_count += 1;
        } else {
            self.mutual_count -= 1;
        }
    }

    pub(crate) fn remove(&mut self, edge: &Edge, nodes: &mut NodeStore) -> Result<bool> {
        if !self.check(edge)? {
            return Ok(false);
        }
        let sid = edge.store_id();
        let Some(slot) = self.slots.get(sid).cloned() else {
            return Ok(false);
        };
        self.unlink(&slot, nodes);
        if slot.mutual {
            if let Some(&reverse) = self.pairs.get(&(slot.target, slot.source, slot.edge_type)) {
                self.set_mutual(sid, reverse, false, nodes);
            }
        }
        if slot.is_self_loop() {
            self.self_loops -= 1;
        }
        self.pairs.remove(&(slot.source, slot.target, slot.edge_type));
        self.dictionary.remove(edge.id());
        if let Some(count) = self.type_counts.get_mut(slot.edge_type as usize) {
            *count -= 1;
        }
        self.slots.free(sid);
        edge.unbind();
        trace!(sid, "edges.remove");
        Ok(true)
    }

    /// Drop every edge. Node adjacency must be reset by the caller.
    pub(crate) fn clear(&mut self) {
        for (_, slot) in self.slots.iter() {
            slot.edge.unbind();
        }
        self.slots.clear();
        self.dictionary.clear();
        self.pairs.clear();
        self.type_counts.clear();
        self.mutual_count = 0;
        self.self_loops = 0;
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Edge at `sid`. Out-of-range ids are a fault; free slots yield `None`.
    pub fn get(&self, sid: StoreId) -> Result<Option<Edge>> {
        self.slots.check_range(sid)?;
        Ok(self.slots.get(sid).map(|slot| slot.edge.clone()))
    }

    pub fn get_by_id(&self, id: &ElementId) -> Option<Edge> {
        let sid = *self.dictionary.get(id)?;
        self.slots.get(sid).map(|slot| slot.edge.clone())
    }

    /// Exact directed lookup `source -> target`.
    pub(crate) fn find(&self, source: StoreId, target: StoreId, ty: StoreId) -> Option<StoreId> {
        self.pairs.get(&(source, target, ty)).copied()
    }

    /// Lookup that also matches an undirected record stored the other way round.
    pub(crate) fn find_either(&self, source: StoreId, target: StoreId, ty: StoreId) -> Option<StoreId> {
        if let Some(sid) = self.find(source, target, ty) {
            return Some(sid);
        }
        if self.kind == GraphKind::Directed {
            return None;
        }
        let reverse = self.find(target, source, ty)?;
        let undirected = self.kind == GraphKind::Undirected
            || self.slots.get(reverse).is_some_and(|slot| !slot.directed);
        undirected.then_some(reverse)
    }

    pub(crate) fn slot(&self, sid: StoreId) -> Option<&EdgeSlot> {
        self.slots.get(sid)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (StoreId, &EdgeSlot)> + '_ {
        self.slots.iter()
    }

    /// Every edge slot touching `node`, self-loops once.
    pub(crate) fn incident(&self, node: &super::nodes::NodeSlot) -> Vec<StoreId> {
        let mut out = Vec::with_capacity((node.out_degree + node.in_degree) as usize);
        for &head in node.head_out.iter() {
            let mut cur = head;
            while let Some(slot) = self.slots.get(cur) {
                out.push(cur);
                cur = slot.next_out;
            }
        }
        for &head in node.head_in.iter() {
            let mut cur = head;
            while let Some(slot) = self.slots.get(cur) {
                if !slot.is_self_loop() {
                    out.push(cur);
                }
                cur = slot.next_in;
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.slots.iter().map(|(_, slot)| &slot.edge)
    }

    // ========================================================================
    // Counters
    // ========================================================================

    pub fn len(&self) -> usize {
        self.slots.size()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn id_bound(&self) -> usize {
        self.slots.len()
    }

    pub fn block_count(&self) -> usize {
        self.slots.block_count()
    }

    pub fn garbage_len(&self) -> usize {
        self.slots.garbage_len()
    }

    pub fn type_count(&self, ty: StoreId) -> usize {
        self.type_counts.get(ty as usize).copied().unwrap_or(0)
    }

    /// Number of mutual pairs (each pair counted once).
    pub fn mutual_count(&self) -> usize {
        self.mutual_count
    }

    pub fn self_loop_count(&self) -> usize {
        self.self_loops
    }

    /// Edges seen by an undirected walk: one per mutual pair.
    pub fn undirected_len(&self) -> usize {
        self.len() - self.mutual_count
    }

    pub(crate) fn next_live(&self, from: usize) -> StoreId {
        self.slots.next_live(from)
    }
}

fn endpoint(nodes: &NodeStore, node: &Node, role: &str) -> Result<StoreId> {
    if nodes.check(node)? {
        Ok(node.store_id())
    } else {
        Err(Error::Ownership(format!("{role} node {} is not stored in this graph", node.id())))
    }
}
