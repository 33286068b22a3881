//! Node handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{ElementId, PropertyMap, Value};
use crate::{NULL_ID, StoreId};

/// A node in the property graph.
///
/// Cloning is cheap and yields the same instance: equality and hashing are by
/// identity, not by id or payload. The store that holds a node writes its
/// arena index into the handle on insertion and resets it on removal.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    id: ElementId,
    store_id: AtomicI32,
    /// Token of the owning store, 0 when unowned.
    owner: AtomicU64,
    properties: RwLock<PropertyMap>,
}

impl Node {
    pub fn new(id: impl Into<ElementId>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: id.into(),
                store_id: AtomicI32::new(NULL_ID),
                owner: AtomicU64::new(0),
                properties: RwLock::new(PropertyMap::new()),
            }),
        }
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn id(&self) -> &ElementId {
        &self.inner.id
    }

    /// Arena index, or [`NULL_ID`] when not stored.
    pub fn store_id(&self) -> StoreId {
        self.inner.store_id.load(Ordering::Acquire)
    }

    pub fn is_stored(&self) -> bool {
        self.store_id() != NULL_ID
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

    pub fn properties(&self) -> PropertyMap {
        self.inner.properties.read().clone()
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

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("store_id", &self.store_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality() {
        let a = Node::new(1);
        let b = Node::new(1);
        assert_eq!(a, a.clone());
        assert_ne!(a, b, "same id, different instance");
    }

    #[test]
    fn test_properties() {
        let n = Node::new("n").with_property("name", "Ada");
        assert_eq!(n.property("name"), Some(Value::from("Ada")));
        assert_eq!(n.remove_property("name"), Some(Value::from("Ada")));
        assert!(n.properties().is_empty());
    }

    #[test]
    fn test_unstored_by_default() {
        let n = Node::new(0);
        assert_eq!(n.store_id(), NULL_ID);
        assert!(!n.is_stored());
        assert_eq!(n.owner(), 0);
    }
}
