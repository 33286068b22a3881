//! Edge handle and traversal enums.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{ElementId, Node, PropertyMap, Value};
use crate::{NULL_ID, StoreId};

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Which half of a combined in-out walk produced an edge.
///
/// A self-loop is reached once per phase; callers that want it once filter
/// on the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Out,
    In,
}

/// An edge between two nodes.
///
/// Like [`Node`], an `Edge` is a shared handle compared by identity. Its
/// endpoints, type label and directedness are fixed at construction.
#[derive(Clone)]
pub struct Edge {
    inner: Arc<EdgeInner>,
}

struct EdgeInner {
    id: ElementId,
    source: Node,
    target: Node,
    edge_type: String,
    directed: bool,
    /// f64 bits
    weight: AtomicU64,
    store_id: AtomicI32,
    owner: AtomicU64,
    properties: RwLock<PropertyMap>,
}

impl Edge {
    pub fn new(
        id: impl Into<ElementId>,
        source: &Node,
        target: &Node,
        edge_type: impl Into<String>,
        directed: bool,
    ) -> Self {
        Self {
            inner: Arc::new(EdgeInner {
                id: id.into(),
                source: source.clone(),
                target: target.clone(),
                edge_type: edge_type.into(),
                directed,
                weight: AtomicU64::new(1.0f64.to_bits()),
                store_id: AtomicI32::new(NULL_ID),
                owner: AtomicU64::new(0),
                properties: RwLock::new(PropertyMap::new()),
            }),
        }
    }

    pub fn directed(id: impl Into<ElementId>, source: &Node, target: &Node, edge_type: impl Into<String>) -> Self {
        Self::new(id, source, target, edge_type, true)
    }

    pub fn undirected(id: impl Into<ElementId>, source: &Node, target: &Node, edge_type: impl Into<String>) -> Self {
        Self::new(id, source, target, edge_type, false)
    }

    pub fn with_weight(self, weight: f64) -> Self {
        self.set_weight(weight);
        self
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.properties.write().insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &ElementId { &self.inner.id }
    pub fn source(&self) -> &Node { &self.inner.source }
    pub fn target(&self) -> &Node { &self.inner.target }
    pub fn edge_type(&self) -> &str { &self.inner.edge_type }
    pub fn is_directed(&self) -> bool { self.inner.directed }

    pub fn is_self_loop(&self) -> bool {
        self.inner.source == self.inner.target
    }

    /// The "other" end of the edge from the given node.
    pub fn other_node(&self, from: &Node) -> Option<&Node> {
        if *from == self.inner.source { Some(&self.inner.target) }
        else if *from == self.inner.target { Some(&self.inner.source) }
        else { None }
    }

    pub fn weight(&self) -> f64 {
        f64::from_bits(self.inner.weight.load(Ordering::Acquire))
    }

    pub fn set_weight(&self, weight: f64) {
        self.inner.weight.store(weight.to_bits(), Ordering::Release);
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        self.inner.properties.read().get(key).cloned()
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.properties.write().insert(key.into(), value.into())
    }

    pub fn remove_property(&self, key: &str) -> Option<Value> {
        self.inner.properties.write().remove(key)
    }

    /// Arena index, or [`NULL_ID`] when not stored.
    pub fn store_id(&self) -> StoreId {
        self.inner.store_id.load(Ordering::Acquire)
    }

    pub fn is_stored(&self) -> bool {
        self.store_id() != NULL_ID
    }

    pub(crate) fn owner(&self) -> u64 {
        self.inner.owner.load(Ordering::Acquire)
    }

    pub(crate) fn bind(&self, owner: u64, store_id: StoreId) {
        self.inner.owner.store(owner, Ordering::Release);
        self.inner.store_id.store(store_id, Ordering::Release);
    }

    pub(crate) fn unbind(&self) {
        self.inner.store_id.store(NULL_ID, Ordering::Release);
        self.inner.owner.store(0, Ordering::Release);
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.inner.id)
            .field("source", self.inner.source.id())
            .field("target", self.inner.target.id())
            .field("type", &self.inner.edge_type)
            .field("directed", &self.inner.directed)
            .field("store_id", &self.store_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_node() {
        let a = Node::new("a");
        let b = Node::new("b");
        let c = Node::new("c");
        let e = Edge::directed(1, &a, &b, "KNOWS");
        assert_eq!(e.other_node(&a), Some(&b));
        assert_eq!(e.other_node(&b), Some(&a));
        assert_eq!(e.other_node(&c), None);
    }

    #[test]
    fn test_weight_and_flags() {
        let a = Node::new("a");
        let e = Edge::undirected("loop", &a, &a, "").with_weight(2.5);
        assert_eq!(e.weight(), 2.5);
        assert!(e.is_self_loop());
        assert!(!e.is_directed());
        e.set_weight(-1.0);
        assert_eq!(e.weight(), -1.0);
    }

    #[test]
    fn test_default_weight_is_one() {
        let a = Node::new(1);
        let b = Node::new(2);
        assert_eq!(Edge::directed(0, &a, &b, "T").weight(), 1.0);
    }
}
