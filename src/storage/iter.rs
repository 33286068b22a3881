//! Cursors over the arenas and adjacency chains.
//!
//! A cursor holds positions only, never borrows. The borrowing iterators in
//! this module wrap one around a store reference; the lock-holding iterators
//! of [`crate::graph`] re-borrow the store on every step instead.

use super::{EdgeStore, NodeStore};
use crate::model::{Direction, Edge, Node, Phase};
use crate::{NULL_ID, StoreId};

/// Walks live slots in arena order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ArenaCursor {
    pos: usize,
}

impl ArenaCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_node(&mut self, nodes: &NodeStore) -> Option<StoreId> {
        let sid = nodes.next_live(self.pos);
        self.step(sid)
    }

    /// Next edge; with `undirected` one record per mutual pair.
    pub fn next_edge(&mut self, edges: &EdgeStore, undirected: bool) -> Option<StoreId> {
        loop {
            let sid = self.step(edges.next_live(self.pos))?;
            let emit = !undirected
                || edges
                    .slot(sid)
                    .is_some_and(|slot| slot.emit_undirected(Phase::Out, false));
            if emit {
                return Some(sid);
            }
        }
    }

    fn step(&mut self, sid: StoreId) -> Option<StoreId> {
        if sid == NULL_ID {
            return None;
        }
        self.pos = sid as usize + 1;
        Some(sid)
    }
}

/// Walks one node's adjacency chains.
///
/// With `Direction::Both` the out-chains are walked first, then the
/// in-chains; the phase of each step is reported. With `edge_type` set only
/// that type's chains are visited.
#[derive(Debug, Clone)]
pub(crate) struct AdjacencyCursor {
    node: StoreId,
    direction: Direction,
    edge_type: Option<StoreId>,
    undirected: bool,
    phase: Phase,
    type_pos: usize,
    next: StoreId,
    done: bool,
}

impl AdjacencyCursor {
    pub fn new(node: StoreId, direction: Direction, edge_type: Option<StoreId>, undirected: bool) -> Self {
        Self {
            node,
            direction,
            edge_type,
            undirected,
            phase: if direction == Direction::Incoming { Phase::In } else { Phase::Out },
            type_pos: edge_type.map_or(0, |t| t as usize),
            next: NULL_ID,
            done: false,
        }
    }

    /// A cursor that yields nothing, for edge types that were never registered.
    pub fn exhausted(mut self) -> Self {
        self.done = true;
        self
    }

    fn open_next_chain(&mut self, nodes: &NodeStore) -> bool {
        let Some(slot) = nodes.slot(self.node) else {
            return false;
        };
        loop {
            let heads = match self.phase {
                Phase::Out => &slot.head_out,
                Phase::In => &slot.head_in,
            };
            let end = match self.edge_type {
                Some(t) => t as usize + 1,
                None => heads.len(),
            };
            while self.type_pos < end {
                let head = heads.get(self.type_pos).copied().unwrap_or(NULL_ID);
                self.type_pos += 1;
                if head != NULL_ID {
                    self.next = head;
                    return true;
                }
            }
            if self.phase == Phase::Out && self.direction == Direction::Both {
                self.phase = Phase::In;
                self.type_pos = self.edge_type.map_or(0, |t| t as usize);
                continue;
            }
            return false;
        }
    }

    pub fn advance(&mut self, nodes: &NodeStore, edges: &EdgeStore) -> Option<(StoreId, Phase)> {
        loop {
            if self.done {
                return None;
            }
            if self.next == NULL_ID && !self.open_next_chain(nodes) {
                self.done = true;
                return None;
            }
            let sid = self.next;
            let Some(slot) = edges.slot(sid) else {
                self.done = true;
                return None;
            };
            let phase = self.phase;
            self.next = match phase {
                Phase::Out => slot.next_out,
                Phase::In => slot.next_in,
            };
            if self.undirected && !slot.emit_undirected(phase, self.direction == Direction::Both) {
                continue;
            }
            return Some((sid, phase));
        }
    }
}

// ============================================================================
// Borrowing iterators
// ============================================================================

/// Live nodes in arena order.
pub struct Nodes<'s> {
    nodes: &'s NodeStore,
    cursor: ArenaCursor,
}

impl<'s> Nodes<'s> {
    pub(crate) fn new(nodes: &'s NodeStore) -> Self {
        Self { nodes, cursor: ArenaCursor::new() }
    }
}

impl<'s> Iterator for Nodes<'s> {
    type Item = &'s Node;

    fn next(&mut self) -> Option<Self::Item> {
        let sid = self.cursor.next_node(self.nodes)?;
        self.nodes.slot(sid).map(|slot| &slot.node)
    }
}

/// Live edges in arena order.
pub struct Edges<'s> {
    edges: &'s EdgeStore,
    cursor: ArenaCursor,
    undirected: bool,
}

impl<'s> Edges<'s> {
    pub(crate) fn new(edges: &'s EdgeStore, undirected: bool) -> Self {
        Self { edges, cursor: ArenaCursor::new(), undirected }
    }
}

impl<'s> Iterator for Edges<'s> {
    type Item = &'s Edge;

    fn next(&mut self) -> Option<Self::Item> {
        let sid = self.cursor.next_edge(self.edges, self.undirected)?;
        self.edges.slot(sid).map(|slot| &slot.edge)
    }
}

/// Edges around one node, tagged with the phase that produced them.
pub struct Adjacency<'s> {
    nodes: &'s NodeStore,
    edges: &'s EdgeStore,
    cursor: AdjacencyCursor,
}

impl<'s> Adjacency<'s> {
    pub(crate) fn new(nodes: &'s NodeStore, edges: &'s EdgeStore, cursor: AdjacencyCursor) -> Self {
        Self { nodes, edges, cursor }
    }
}

impl<'s> Iterator for Adjacency<'s> {
    type Item = (Phase, &'s Edge);

    fn next(&mut self) -> Option<Self::Item> {
        let (sid, phase) = self.cursor.advance(self.nodes, self.edges)?;
        self.edges.slot(sid).map(|slot| (phase, &slot.edge))
    }
}
