//! Node arena.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::trace;

use super::{SlotAllocator, StoreToken};
use crate::model::{ElementId, Node};
use crate::{Error, NULL_ID, Result, StoreId};

/// Arena record of a stored node.
///
/// `head_out[t]` / `head_in[t]` are the first edge slots of the node's
/// out- and in-chains for edge type `t`.
#[derive(Debug, Clone)]
pub(crate) struct NodeSlot {
    pub node: Node,
    pub head_out: SmallVec<[StoreId; 2]>,
    pub head_in: SmallVec<[StoreId; 2]>,
    pub out_degree: u32,
    pub in_degree: u32,
    pub mutual_degree: u32,
}

impl NodeSlot {
    fn new(node: Node) -> Self {
        Self {
            node,
            head_out: SmallVec::new(),
            head_in: SmallVec::new(),
            out_degree: 0,
            in_degree: 0,
            mutual_degree: 0,
        }
    }

    pub fn head_out(&self, edge_type: StoreId) -> StoreId {
        self.head_out.get(edge_type as usize).copied().unwrap_or(NULL_ID)
    }

    pub fn head_in(&self, edge_type: StoreId) -> StoreId {
        self.head_in.get(edge_type as usize).copied().unwrap_or(NULL_ID)
    }

    pub fn set_head_out(&mut self, edge_type: StoreId, edge: StoreId) {
        set_head(&mut self.head_out, edge_type, edge);
    }

    pub fn set_head_in(&mut self, edge_type: StoreId, edge: StoreId) {
        set_head(&mut self.head_in, edge_type, edge);
    }

    pub fn reset_adjacency(&mut self) {
        self.head_out.clear();
        self.head_in.clear();
        self.out_degree = 0;
        self.in_degree = 0;
        self.mutual_degree = 0;
    }
}

fn set_head(heads: &mut SmallVec<[StoreId; 2]>, edge_type: StoreId, edge: StoreId) {
    let t = edge_type as usize;
    if heads.len() <= t {
        if edge == NULL_ID {
            return;
        }
        heads.resize(t + 1, NULL_ID);
    }
    heads[t] = edge;
}

/// Node arena plus its external-id dictionary.
#[derive(Debug)]
pub struct NodeStore {
    token: StoreToken,
    slots: SlotAllocator<NodeSlot>,
    dictionary: HashMap<ElementId, StoreId>,
}

impl NodeStore {
    pub(crate) fn new(token: StoreToken, block_size: usize) -> Self {
        Self {
            token,
            slots: SlotAllocator::with_block_size(block_size),
            dictionary: HashMap::new(),
        }
    }

    /// Whether `node` is currently stored here.
    ///
    /// Fails with [`Error::Ownership`] when it is stored in another store.
    pub fn check(&self, node: &Node) -> Result<bool> {
        match node.owner() {
            0 => Ok(false),
            owner if owner == self.token => Ok(self
                .slots
                .get(node.store_id())
                .is_some_and(|slot| slot.node == *node)),
            _ => Err(Error::Ownership(format!("node {} belongs to another store", node.id()))),
        }
    }

    /// Store id of a node that must be live here.
    pub fn resolve(&self, node: &Node) -> Result<StoreId> {
        if self.check(node)? {
            Ok(node.store_id())
        } else {
            Err(Error::NotFound(format!("node {} is not in this store", node.id())))
        }
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.check(node).unwrap_or(false)
    }

    pub(crate) fn add(&mut self, node: &Node) -> Result<bool> {
        if node.id().is_absent() {
            return Err(Error::NullInput("node id is empty".into()));
        }
        if self.check(node)? {
            return Ok(false);
        }
        if self.dictionary.contains_key(node.id()) {
            return Err(Error::Duplicate(format!("node id {} already exists", node.id())));
        }
        let sid = self.slots.alloc(NodeSlot::new(node.clone()))?;
        self.dictionary.insert(node.id().clone(), sid);
        node.bind(self.token, sid);
        trace!(sid, id = %node.id(), "nodes.add");
        Ok(true)
    }

    /// Free the slot of a node whose edges are already gone.
    pub(crate) fn remove(&mut self, node: &Node) -> Result<bool> {
        if !self.check(node)? {
            return Ok(false);
        }
        let sid = node.store_id();
        if let Some(slot) = self.slots.free(sid) {
            debug_assert_eq!(slot.out_degree + slot.in_degree, 0);
        }
        self.dictionary.remove(node.id());
        node.unbind();
        trace!(sid, id = %node.id(), "nodes.remove");
        Ok(true)
    }

    /// Node at `sid`. Out-of-range ids are a fault; free slots yield `None`.
    pub fn get(&self, sid: StoreId) -> Result<Option<Node>> {
        self.slots.check_range(sid)?;
        Ok(self.slots.get(sid).map(|slot| slot.node.clone()))
    }

    pub fn get_by_id(&self, id: &ElementId) -> Option<Node> {
        let sid = *self.dictionary.get(id)?;
        self.slots.get(sid).map(|slot| slot.node.clone())
    }

    pub(crate) fn slot(&self, sid: StoreId) -> Option<&NodeSlot> {
        self.slots.get(sid)
    }

    pub(crate) fn slot_mut(&mut self, sid: StoreId) -> Option<&mut NodeSlot> {
        self.slots.get_mut(sid)
    }

    pub fn len(&self) -> usize {
        self.slots.size()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// One past the highest live store id.
    pub fn id_bound(&self) -> usize {
        self.slots.len()
    }

    pub fn block_count(&self) -> usize {
        self.slots.block_count()
    }

    pub fn garbage_len(&self) -> usize {
        self.slots.garbage_len()
    }

    pub(crate) fn next_live(&self, from: usize) -> StoreId {
        self.slots.next_live(from)
    }

    /// Live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.slots.iter().map(|(_, slot)| &slot.node)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (StoreId, &NodeSlot)> + '_ {
        self.slots.iter()
    }

    pub(crate) fn reset_adjacency(&mut self) {
        let ids: Vec<StoreId> = self.slots.iter().map(|(sid, _)| sid).collect();
        for sid in ids {
            if let Some(slot) = self.slots.get_mut(sid) {
                slot.reset_adjacency();
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        for (_, slot) in self.slots.iter() {
            slot.node.unbind();
        }
        self.slots.clear();
        self.dictionary.clear();
    }
}
